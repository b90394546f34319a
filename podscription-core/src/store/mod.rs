pub mod conversation;
pub mod state;

pub use conversation::{ConversationStore, SendOutcome};
pub use state::{reduce, Action, StoreState};
