pub mod config;
pub mod errors;
pub mod models;

pub use config::Settings;
pub use errors::BotError;
pub use models::{
    Card,
    CardField,
    Example,
    Explanations,
    Identity,
    Ipa,
    Translation,
    Word,
};
