use std::sync::LazyLock;

use engine_logging::{engine_info, engine_warn};
use regex::Regex;
use serde_json::Value;

use crate::frame::Frame;

static ARTIFACT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Filename: ([A-Za-z0-9_-]+\.nc)").expect("artifact pattern compiles")
});

/// A status frame normalized for the run log.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// Progress as a percentage, `None` when the frame had no usable `status`.
    pub percent: Option<f64>,
    pub message: String,
    /// Artifact filename mentioned by the message, if any.
    pub artifact: Option<String>,
}

/// Interprets one decoded frame; never fails.
///
/// `status` arrives as a 0.0..=1.0 fraction and is scaled to a percentage.
/// Missing or malformed fields are logged and replaced with best-effort values.
pub fn interpret_frame(frame: &Frame) -> StatusUpdate {
    let percent = match frame.get("status") {
        Some(Value::Number(number)) => number.as_f64().map(|fraction| fraction * 100.0),
        Some(other) => {
            engine_warn!("Status frame has non-numeric status {}", other);
            None
        }
        None => {
            engine_warn!("Status frame is missing `status`");
            None
        }
    };

    let message = match frame.get("message") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(other) => {
            engine_warn!("Status frame has non-string message {}", other);
            None
        }
        None => {
            engine_warn!("Status frame is missing `message`");
            None
        }
    };

    let artifact = message.as_deref().and_then(extract_artifact);

    StatusUpdate {
        percent,
        message: message.unwrap_or_default(),
        artifact,
    }
}

/// Finds the `<name>.nc` token of a message that starts with `Filename: `.
pub fn extract_artifact(message: &str) -> Option<String> {
    match ARTIFACT_PATTERN.captures(message) {
        Some(captures) => {
            let name = captures[1].to_string();
            engine_info!("Extracted artifact filename {}", name);
            Some(name)
        }
        None => {
            if message.starts_with("Filename:") {
                engine_warn!("Failed to extract artifact filename from {:?}", message);
            }
            None
        }
    }
}

/// Whether `name` is a bare artifact filename as the service emits them.
pub fn is_artifact_name(name: &str) -> bool {
    name.strip_suffix(".nc").is_some_and(|stem| {
        !stem.is_empty()
            && stem
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_artifact, interpret_frame, is_artifact_name, StatusUpdate};
    use crate::frame::Frame;

    fn frame(value: serde_json::Value) -> Frame {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn status_is_scaled_to_percent() {
        let update = interpret_frame(&frame(json!({"status": 0.42, "message": "Integrating"})));
        assert!((update.percent.unwrap() - 42.0).abs() < 1e-9);

        let update = interpret_frame(&frame(json!({"status": 1.0, "message": "Done"})));
        assert_eq!(update.percent, Some(100.0));

        let update = interpret_frame(&frame(json!({"status": 0, "message": "Queued"})));
        assert_eq!(update.percent, Some(0.0));
    }

    #[test]
    fn artifact_is_extracted_from_message() {
        let update = interpret_frame(&frame(
            json!({"status": 1.0, "message": "Filename: run-001.nc"}),
        ));
        assert_eq!(update.artifact.as_deref(), Some("run-001.nc"));
    }

    #[test]
    fn malformed_fields_yield_best_effort_update() {
        let update = interpret_frame(&frame(json!({"status": "high", "message": 7})));
        assert_eq!(
            update,
            StatusUpdate {
                percent: None,
                message: String::new(),
                artifact: None,
            }
        );

        let update = interpret_frame(&frame(json!({"status": 0.5})));
        assert_eq!(update.percent, Some(50.0));
        assert_eq!(update.message, "");
    }

    #[test]
    fn artifact_pattern_requires_nc_token() {
        assert_eq!(
            extract_artifact("Filename: ocean_2024-05.nc written"),
            Some("ocean_2024-05.nc".to_string())
        );
        assert_eq!(extract_artifact("Filename: report.csv"), None);
        assert_eq!(extract_artifact("Filename:run.nc"), None);
        assert_eq!(extract_artifact("Filename:\trun.nc"), None);
        assert_eq!(extract_artifact("no artifact here"), None);
    }

    #[test]
    fn artifact_prefix_must_start_the_message() {
        assert_eq!(extract_artifact("Output Filename: x.nc"), None);
        assert_eq!(extract_artifact(" Filename: x.nc"), None);
        assert_eq!(extract_artifact("Filename: x.nc"), Some("x.nc".to_string()));
    }

    #[test]
    fn artifact_names_reject_paths() {
        assert!(is_artifact_name("run-001.nc"));
        assert!(!is_artifact_name("../run.nc"));
        assert!(!is_artifact_name(".nc"));
        assert!(!is_artifact_name("run.txt"));
    }
}
