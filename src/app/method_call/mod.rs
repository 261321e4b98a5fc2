// Method call dispatcher - Named entry points with JSON arguments

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::app::video_processor::VideoProcessor;
use crate::domain::errors::*;

pub const PROCESS_VIDEO: &str = "processVideo";
pub const TRIM_VIDEO: &str = "trimVideo";

/// A host call: method name plus JSON arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Parse arguments given as a JSON document
    pub fn from_json(method: impl Into<String>, arguments: &str) -> Result<Self, DomainError> {
        let arguments = serde_json::from_str(arguments)
            .map_err(|e| DomainError::BadArgs(format!("Arguments are not valid JSON: {}", e)))?;
        Ok(Self::new(method, arguments))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessVideoArgs {
    path: String,
    start_time: f64,
    end_time: f64,
    #[serde(default)]
    resolution_height: Option<u32>,
    #[serde(default)]
    android_bitrate: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrimVideoArgs {
    path: String,
    start_time: f64,
    end_time: f64,
}

fn parse_args<T: DeserializeOwned>(method: &str, arguments: Value) -> Result<T, DomainError> {
    serde_json::from_value(arguments)
        .map_err(|e| DomainError::BadArgs(format!("Invalid arguments for {}: {}", method, e)))
}

/// Dispatch `call` to the processor and wait for its result. Replies with
/// the output path as a JSON string.
pub async fn handle_method_call(processor: &VideoProcessor, call: MethodCall) -> Result<Value, DomainError> {
    debug!(method = %call.method, "Method call");

    let output = match call.method.as_str() {
        PROCESS_VIDEO => {
            let args: ProcessVideoArgs = parse_args(PROCESS_VIDEO, call.arguments)?;
            processor
                .process_video(
                    args.path,
                    args.start_time,
                    args.end_time,
                    args.resolution_height,
                    args.android_bitrate,
                )
                .await?
        }
        TRIM_VIDEO => {
            let args: TrimVideoArgs = parse_args(TRIM_VIDEO, call.arguments)?;
            processor
                .trim_video(args.path, args.start_time, args.end_time)
                .await?
        }
        other => {
            warn!("Unknown method: {}", other);
            return Err(DomainError::NotImplemented(other.to_string()));
        }
    };

    Ok(Value::String(output.to_string_lossy().into_owned()))
}
