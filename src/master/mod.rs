//! Master side: the Telegram bot the operator talks to.

pub mod commands;
pub mod handler;
pub mod telegram;
pub mod transport;

pub use handler::MasterHandler;
pub use telegram::TelegramTransport;
