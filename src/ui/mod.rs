mod command;
pub mod terminal;
pub mod transcript;

pub use command::Command;
