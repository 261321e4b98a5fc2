//! Rendering of the notification channel and final results

use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use crate::domain::errors::{DomainError, ErrorCode};
use crate::domain::model::ChannelEvent;
use crate::domain::rules::ProgressRules;

const BAR_WIDTH: usize = 30;

/// One JSON line on stdout
#[derive(Serialize)]
struct JsonLine<'a, T: Serialize> {
    timestamp: String,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ResultLine<'a> {
    Result { output: &'a Path },
    Failed { code: ErrorCode, message: String },
}

/// Renders progress as a console bar or as JSON lines
pub struct ProgressReporter {
    json: bool,
    started: Instant,
    last_percent: Option<i32>,
}

impl ProgressReporter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            started: Instant::now(),
            last_percent: None,
        }
    }

    /// Render one channel event
    pub fn on_event(&mut self, event: &ChannelEvent) {
        if self.json {
            emit_json(event);
            return;
        }

        match event {
            ChannelEvent::Progress { value } => {
                let percent = ProgressRules::fraction_to_percent(*value);
                if self.last_percent == Some(percent) {
                    return;
                }
                self.last_percent = Some(percent);
                let mut stderr = io::stderr();
                let _ = write!(stderr, "\r{}", render_bar(*value, self.started.elapsed().as_secs_f64()));
                let _ = stderr.flush();
            }
            ChannelEvent::Error { code, message } => {
                self.end_line();
                eprintln!("Error [{}]: {}", code, message);
            }
        }
    }

    /// Render the job's final result
    pub fn finish(&mut self, result: &Result<std::path::PathBuf, DomainError>) {
        if self.json {
            match result {
                Ok(path) => emit_json(&ResultLine::Result { output: path }),
                Err(e) => emit_json(&ResultLine::Failed {
                    code: e.code(),
                    message: e.detail(),
                }),
            }
            return;
        }

        self.end_line();
        if let Ok(path) = result {
            println!("{}", path.display());
            eprintln!("Done in {:.2}s", self.started.elapsed().as_secs_f64());
        }
    }

    fn end_line(&mut self) {
        if self.last_percent.take().is_some() {
            eprintln!();
        }
    }
}

fn emit_json<T: Serialize>(body: &T) {
    let line = JsonLine {
        timestamp: Utc::now().to_rfc3339(),
        body,
    };
    if let Ok(text) = serde_json::to_string(&line) {
        println!("{}", text);
    }
}

/// `[#########---------]  42%  3.1s`
pub fn render_bar(fraction: f64, elapsed_secs: f64) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * BAR_WIDTH as f64) as usize;
    format!(
        "[{}{}] {:>3}%  {:.1}s",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        ProgressRules::fraction_to_percent(fraction),
        elapsed_secs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bar() {
        let bar = render_bar(0.5, 1.25);
        assert!(bar.starts_with(&format!("[{}{}]", "#".repeat(15), "-".repeat(15))));
        assert!(bar.contains(" 50%"));
        assert!(bar.ends_with("1.2s") || bar.ends_with("1.3s"));
    }

    #[test]
    fn test_render_bar_clamps() {
        assert!(render_bar(3.0, 0.0).contains("100%"));
        assert!(render_bar(f64::NAN, 0.0).contains("  0%"));
    }

    #[test]
    fn test_json_line_shape() {
        let event = ChannelEvent::Progress { value: 0.25 };
        let line = JsonLine {
            timestamp: "t".to_string(),
            body: &event,
        };
        let value: serde_json::Value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["event"], "progress");
        assert_eq!(value["value"], 0.25);
        assert_eq!(value["timestamp"], "t");

        let failed = ResultLine::Failed {
            code: ErrorCode::ExportCancelled,
            message: "Export cancelled".to_string(),
        };
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["event"], "failed");
        assert_eq!(value["code"], "EXPORT_CANCELLED");
    }
}
