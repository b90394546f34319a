pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod store;

pub use config::PodscriptionConfig;
pub use error::GatewayError;
pub use gateway::{ChatResponse, HealthStatus, HttpGateway, PodDoctorApi};
pub use models::{IntentCategory, Message, PodIntent, Prescription, Role, Session};
pub use store::{Action, ConversationStore, SendOutcome, StoreState};
