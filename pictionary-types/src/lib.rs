pub mod errors;
pub mod messages;
pub mod round;
pub mod word;

// Re-export all types
pub use errors::*;
pub use messages::*;
pub use round::*;
pub use word::*;

pub type RoundId = uuid::Uuid;
