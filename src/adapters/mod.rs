// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod export_callback;
pub mod export_polling;
pub mod fs_local;
pub mod probe_libav;
pub mod toml_config;

// Re-export adapters
pub use export_callback::CallbackExportAdapter;
pub use export_polling::PollingExportAdapter;
pub use fs_local::FsLocalAdapter;
pub use probe_libav::ProbeLibavAdapter;
pub use toml_config::{Settings, TomlConfigAdapter};
