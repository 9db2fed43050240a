pub mod access;
pub mod anki;
pub mod bot;
pub mod core;
pub mod generation;
pub mod persistence;
pub mod session;
pub mod spelling;
pub mod websocket;
