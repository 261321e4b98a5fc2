//! Transform engine: job start, progress relay and notification dispatch

pub mod bridge;
pub mod dispatch;
pub mod invoker;
pub mod job;
pub mod progress;

pub use bridge::ProgressBridge;
pub use dispatch::MainContext;
pub use invoker::{EncodingDefaults, TransformInvoker};
pub use job::{Job, JobHandle, JobSlot};
pub use progress::{EventSink, EventStream, SinkSlot};
