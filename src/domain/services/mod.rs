mod chat_session;
mod chat_store;
mod notifier;
mod url_params;

pub use chat_session::*;
pub use chat_store::*;
pub use notifier::*;
pub use url_params::*;
