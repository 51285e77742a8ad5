mod attachment;
mod author;
mod backend;
mod chat;
mod chat_event;
mod event;
mod message;
mod slash_commands;
mod store;
pub mod timestamp;
mod toast;

pub use attachment::*;
pub use author::*;
pub use backend::*;
pub use chat::*;
pub use chat_event::*;
pub use event::*;
pub use message::*;
pub use slash_commands::*;
pub use store::*;
pub use toast::*;
