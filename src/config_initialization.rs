//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::toml_config::{Settings, TomlConfigAdapter};
use crate::cli::Cli;
use crate::domain::errors::DomainError;
use crate::ports::ProgressStrategy;
use crate::utils::logging::{LogFormat, LogLevel};

/// Resolve settings following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<Settings> {
    // Steps 1 and 2: defaults, then the config file if any
    let mut settings = match &cli.config {
        Some(path) => TomlConfigAdapter::load_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => TomlConfigAdapter::load_default().context("Failed to load configuration")?,
    };

    // Step 3: environment variables
    TomlConfigAdapter::apply_env(&mut settings, |key| std::env::var(key).ok())
        .context("Invalid environment configuration")?;

    // Step 4: CLI arguments
    apply_cli_configuration_overrides(&mut settings, cli)
        .context("Invalid command-line configuration")?;

    Ok(settings)
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_configuration_overrides(settings: &mut Settings, cli: &Cli) -> Result<usize, DomainError> {
    let mut cli_overrides = 0;

    if let Some(level) = &cli.log_level {
        settings.log_level = LogLevel::parse(level).map_err(DomainError::BadArgs)?;
        cli_overrides += 1;
    }
    if let Some(format) = &cli.log_format {
        settings.log_format = LogFormat::parse(format).map_err(DomainError::BadArgs)?;
        cli_overrides += 1;
    }
    if let Some(strategy) = &cli.strategy {
        settings.progress_strategy = ProgressStrategy::parse(strategy)?;
        cli_overrides += 1;
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = Some(dir.clone());
        cli_overrides += 1;
    }

    settings.validate()?;
    Ok(cli_overrides)
}

/// Log the resolved settings once logging is up
pub fn log_effective_settings(settings: &Settings) {
    info!(
        strategy = %settings.progress_strategy,
        poll_interval_ms = settings.poll_interval_ms,
        video_codec = %settings.video_codec,
        preset = %settings.preset,
        crf = settings.crf,
        threads = settings.effective_threads(),
        "Configuration resolved"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli::try_parse_from([
            "video-processor",
            "--strategy",
            "poll",
            "--log-level",
            "debug",
            "inspect",
            "--input",
            "a.mp4",
        ])
        .unwrap();

        let mut settings = Settings::default();
        let applied = apply_cli_configuration_overrides(&mut settings, &cli).unwrap();

        assert_eq!(applied, 2);
        assert_eq!(settings.progress_strategy, ProgressStrategy::Polling);
        assert_eq!(settings.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_cli_override_rejected() {
        let cli = Cli::try_parse_from([
            "video-processor",
            "--log-format",
            "xml",
            "inspect",
            "--input",
            "a.mp4",
        ])
        .unwrap();

        let mut settings = Settings::default();
        assert!(apply_cli_configuration_overrides(&mut settings, &cli).is_err());
    }
}
