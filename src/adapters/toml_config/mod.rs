// TOML config adapter - Processor settings from TOML files and environment

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::ports::ProgressStrategy;
use crate::utils::logging::{LogFormat, LogLevel, LoggingConfig};

/// Highest CRF accepted by x264
pub const MAX_CRF: u8 = 51;

/// Prefix of environment overrides, e.g. `VIDEO_PROCESSOR_CRF`
pub const ENV_PREFIX: &str = "VIDEO_PROCESSOR_";

/// Processor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// ffmpeg executable; searched on `PATH` when unset
    pub ffmpeg_path: Option<PathBuf>,
    /// Directory for generated outputs; the system temp dir when unset
    pub output_dir: Option<PathBuf>,
    pub progress_strategy: ProgressStrategy,
    pub poll_interval_ms: u64,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u8,
    /// Encoder threads; 0 means one per CPU
    pub threads: usize,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            output_dir: None,
            progress_strategy: ProgressStrategy::Callback,
            poll_interval_ms: 100,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            threads: 0,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
        }
    }
}

impl Settings {
    /// Poll timer period
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Encoder thread count with 0 resolved to the CPU count
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level,
            format: self.log_format,
        }
    }

    /// Reject values no export could run with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.crf > MAX_CRF {
            return Err(DomainError::BadArgs(format!(
                "CRF value cannot exceed {}: {}",
                MAX_CRF, self.crf
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(DomainError::BadArgs(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        for (key, value) in [
            ("video_codec", &self.video_codec),
            ("audio_codec", &self.audio_codec),
            ("preset", &self.preset),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::BadArgs(format!("{} cannot be empty", key)));
            }
        }
        Ok(())
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Candidate config files, in lookup order
    pub fn default_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("video_processor.toml"),
            PathBuf::from("config").join("video_processor.toml"),
        ]
    }

    /// Parse settings from the `[processor]` table of a TOML document
    pub fn parse(toml_content: &str) -> Result<Settings, DomainError> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            processor: Settings,
        }

        let document: Document = toml::from_str(toml_content)
            .map_err(|e| DomainError::BadArgs(format!("Failed to parse TOML config: {}", e)))?;
        document.processor.validate()?;
        Ok(document.processor)
    }

    /// Load settings from a TOML file
    pub fn load_file(path: &Path) -> Result<Settings, DomainError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::BadArgs(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let settings = Self::parse(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(settings)
    }

    /// Load the first default config file that exists, or defaults
    pub fn load_default() -> Result<Settings, DomainError> {
        match Self::default_config_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_file(&path),
            None => {
                debug!("No configuration file found; using defaults");
                Ok(Settings::default())
            }
        }
    }

    /// Apply `VIDEO_PROCESSOR_*` overrides read through `lookup`
    pub fn apply_env<F>(settings: &mut Settings, lookup: F) -> Result<usize, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        let var = |key: &str| lookup(&format!("{}{}", ENV_PREFIX, key));

        if let Some(value) = var("FFMPEG_PATH") {
            settings.ffmpeg_path = Some(PathBuf::from(value));
            applied += 1;
        }
        if let Some(value) = var("OUTPUT_DIR") {
            settings.output_dir = Some(PathBuf::from(value));
            applied += 1;
        }
        if let Some(value) = var("PROGRESS_STRATEGY") {
            settings.progress_strategy = ProgressStrategy::parse(&value)?;
            applied += 1;
        }
        if let Some(value) = var("POLL_INTERVAL_MS") {
            settings.poll_interval_ms = parse_number("POLL_INTERVAL_MS", &value)?;
            applied += 1;
        }
        if let Some(value) = var("VIDEO_CODEC") {
            settings.video_codec = value;
            applied += 1;
        }
        if let Some(value) = var("AUDIO_CODEC") {
            settings.audio_codec = value;
            applied += 1;
        }
        if let Some(value) = var("PRESET") {
            settings.preset = value;
            applied += 1;
        }
        if let Some(value) = var("CRF") {
            settings.crf = parse_number("CRF", &value)?;
            applied += 1;
        }
        if let Some(value) = var("THREADS") {
            settings.threads = parse_number("THREADS", &value)?;
            applied += 1;
        }
        if let Some(value) = var("LOG_LEVEL") {
            settings.log_level = LogLevel::parse(&value).map_err(DomainError::BadArgs)?;
            applied += 1;
        }
        if let Some(value) = var("LOG_FORMAT") {
            settings.log_format = LogFormat::parse(&value).map_err(DomainError::BadArgs)?;
            applied += 1;
        }

        settings.validate()?;
        Ok(applied)
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, DomainError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        DomainError::BadArgs(format!("Invalid {}{} value '{}': {}", ENV_PREFIX, key, value, e))
    })
}
