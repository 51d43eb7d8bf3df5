pub mod guess_matcher;
pub mod round;
pub mod round_events;
pub mod word_catalog;

// Re-export main components
pub use round::*;
pub use round_events::*;
pub use word_catalog::*;
