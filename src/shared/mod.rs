//! Shared components used by both the client and server drivers.

pub mod message;
pub mod stream;

// Re-export commonly used types
pub use message::Message;
pub use stream::EventStream;
