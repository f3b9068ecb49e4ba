//! Model ensemble configuration.
//!
//! The configuration document is a JSON array with one object per ensemble
//! member. Fields are read leniently: a missing or mistyped field falls back
//! to its zero value instead of rejecting the entry, and one bad entry never
//! stops the others from loading.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LivenessError;

/// Preprocessing parameters for one model of the ensemble.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model file stem, resolved by the native engine inside the model directory.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    /// Model input width in pixels.
    #[serde(default, deserialize_with = "lenient_i32")]
    pub width: i32,

    /// Model input height in pixels.
    #[serde(default, deserialize_with = "lenient_i32")]
    pub height: i32,

    /// Factor applied to the face box before cropping.
    #[serde(default, deserialize_with = "lenient_f32")]
    pub scale: f32,

    /// Horizontal shift of the crop, as a fraction of the box width.
    #[serde(default, deserialize_with = "lenient_f32")]
    pub shift_x: f32,

    /// Vertical shift of the crop, as a fraction of the box height.
    #[serde(default, deserialize_with = "lenient_f32")]
    pub shift_y: f32,

    /// Resize the whole frame instead of cropping around the face.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub org_resize: bool,
}

impl ModelConfig {
    /// Check that the model input size is usable. Parsing never enforces
    /// this; it is checked when the ensemble is handed to the engine.
    pub fn validate(&self) -> Result<(), LivenessError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(LivenessError::InvalidModelConfig {
                name: self.name.clone(),
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Parse a configuration document into the ensemble, in document order.
///
/// Returns an empty list when the document is not a JSON array or has no
/// usable entries. The empty list is the load-failure signal consumed by
/// [`crate::EngineSession::load`].
pub fn parse_configs(document: &str) -> Vec<ModelConfig> {
    let entries: Vec<Value> = match serde_json::from_str(document) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("model config document is not a JSON array: {e}");
            return Vec::new();
        }
    };

    let mut configs = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if !entry.is_object() {
            warn!("skipping model config entry {index}: not an object");
            continue;
        }
        match ModelConfig::deserialize(entry) {
            Ok(config) => configs.push(config),
            Err(e) => warn!("skipping model config entry {index}: {e}"),
        }
    }

    debug!("parsed {} model config(s)", configs.len());
    configs
}

/// Read and parse the configuration document at `path`.
///
/// A missing or unreadable file yields an empty list, like an empty document.
pub fn read_configs(path: impl AsRef<Path>) -> Vec<ModelConfig> {
    match read_document(path.as_ref()) {
        Ok(document) => parse_configs(&document),
        Err(e) => {
            warn!("{e}");
            Vec::new()
        }
    }
}

pub(crate) fn read_document(path: &Path) -> Result<String, LivenessError> {
    std::fs::read_to_string(path)
        .map_err(|e| LivenessError::ConfigRead(format!("{}: {e}", path.display())))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    // Fractional values truncate toward zero, out-of-range values saturate.
    Ok(as_f64(&value).map(|v| v as i32).unwrap_or_default())
}

fn lenient_f32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_f64(&value).map(|v| v as f32).unwrap_or_default())
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_only_entry_gets_zero_values() {
        let configs = parse_configs(r#"[{"name":"m1"}]"#);
        assert_eq!(configs.len(), 1);
        let config = &configs[0];
        assert_eq!(config.name, "m1");
        assert_eq!(config.width, 0);
        assert_eq!(config.height, 0);
        assert_eq!(config.scale, 0.0);
        assert_eq!(config.shift_x, 0.0);
        assert_eq!(config.shift_y, 0.0);
        assert!(!config.org_resize);
    }

    #[test]
    fn full_entry() {
        let configs = parse_configs(
            r#"[{"name":"model_1","width":80,"height":80,"scale":2.7,"shift_x":0.0,"shift_y":0.0,"org_resize":false}]"#,
        );
        assert_eq!(
            configs,
            vec![ModelConfig {
                name: "model_1".into(),
                width: 80,
                height: 80,
                scale: 2.7,
                shift_x: 0.0,
                shift_y: 0.0,
                org_resize: false,
            }]
        );
    }

    #[test]
    fn document_order_is_kept() {
        let configs = parse_configs(r#"[{"name":"b"},{"name":"a"},{"name":"c"}]"#);
        let names: Vec<_> = configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn mistyped_field_does_not_spoil_entry() {
        let configs = parse_configs(
            r#"[{"name":"m1","width":"wide","height":96,"scale":[1],"org_resize":"yes"},{"name":"m2","width":80}]"#,
        );
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].width, 0);
        assert_eq!(configs[0].height, 96);
        assert_eq!(configs[0].scale, 0.0);
        assert!(!configs[0].org_resize);
        assert_eq!(configs[1].width, 80);
    }

    #[test]
    fn numeric_strings_and_fractions_are_coerced() {
        let configs = parse_configs(
            r#"[{"name":7,"width":"96","height":95.9,"scale":"4.0","shift_y":0.2,"org_resize":"TRUE"}]"#,
        );
        let config = &configs[0];
        assert_eq!(config.name, "7");
        assert_eq!(config.width, 96);
        assert_eq!(config.height, 95);
        assert_eq!(config.scale, 4.0);
        assert!((config.shift_y - 0.2).abs() < f32::EPSILON);
        assert!(config.org_resize);
    }

    #[test]
    fn null_fields_default() {
        let configs = parse_configs(r#"[{"name":null,"width":null,"org_resize":null}]"#);
        assert_eq!(configs[0], ModelConfig::default());
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let configs = parse_configs(r#"[1, "m", {"name":"m1"}, null]"#);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "m1");
    }

    #[test]
    fn empty_or_invalid_document_yields_nothing() {
        assert!(parse_configs("[]").is_empty());
        assert!(parse_configs("").is_empty());
        assert!(parse_configs("{\"name\":\"m1\"}").is_empty());
        assert!(parse_configs("[{\"name\":").is_empty());
    }

    #[test]
    fn missing_file_yields_nothing() {
        assert!(read_configs("/nonexistent/live/config.json").is_empty());
    }

    #[test]
    fn validate_rejects_non_positive_size() {
        let config = ModelConfig {
            name: "m1".into(),
            width: 0,
            height: 80,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LivenessError::InvalidModelConfig { width: 0, height: 80, .. })
        ));

        let config = ModelConfig {
            width: 80,
            height: 80,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
