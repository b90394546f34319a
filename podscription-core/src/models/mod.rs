pub mod message;
pub mod session;

pub use message::{IntentCategory, Message, PodIntent, Prescription, Role};
pub use session::Session;
