// Application layer - Processor facade and host entry points

pub mod container;
pub mod method_call;
pub mod video_processor;

// Re-export entry points
pub use method_call::{handle_method_call, MethodCall};
pub use video_processor::VideoProcessor;
