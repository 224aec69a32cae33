mod conversation;
mod event_handler;
mod narration;
mod state;
#[cfg(test)]
pub(crate) mod testing;

pub use event_handler::handle_event;
pub use state::{AppEvent, AppState, AppStatus, Collaborators};
