pub mod commands;
pub mod handler;
pub mod replies;

pub use commands::Command;
pub use handler::BotHandler;
