pub mod bridge;
pub mod constructors;
pub mod error;
pub mod pipe;

pub mod whenable;

// Re-export the core types at the crate root
pub use error::{StreamError, StreamResult};
pub use whenable::{Emitter, StreamStatus, Whenable};

pub use bridge::EventStream;
pub use constructors::{emit, empty, failed, from_iter};
