//! Console and JSON rendering of job progress and results

pub mod reporter;

pub use reporter::ProgressReporter;
