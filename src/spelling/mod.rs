pub mod checker;
pub mod dictionary;
mod inflection;

pub use checker::{
    SpellCheck,
    SpellChecker,
    WordRejection,
};
pub use dictionary::WordList;
