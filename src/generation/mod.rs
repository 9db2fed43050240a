pub mod backend;
pub mod merger;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod validator;

pub use backend::{
    BackendError,
    GenerationBackend,
    OllamaBackend,
};
pub use merger::{
    merge,
    MergeError,
};
pub use pipeline::{
    CardGenerator,
    GenerationError,
};
pub use validator::{
    CardAttempt,
    FieldVerdicts,
    Verdict,
};
