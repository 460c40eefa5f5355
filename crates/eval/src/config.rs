use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_AMBIGUOUS_CLOSENESS: f64 = 0.2;
pub const DEFAULT_LOW_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_MULTI_LABEL: f64 = 1.0;
pub const DEFAULT_UNKNOWN_LABEL: f64 = 0.3;

/// Decision thresholds for one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// Top two scores closer than this mark the utterance ambiguous.
    pub ambiguous_closeness: f64,
    /// Top score below this marks the utterance low-confidence.
    pub low_confidence: f64,
    /// Every label scoring at least this is predicted.
    pub multi_label: f64,
    /// Without a multi-label hit, a top score below this predicts `UNKNOWN`.
    pub unknown_label: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ambiguous_closeness: DEFAULT_AMBIGUOUS_CLOSENESS,
            low_confidence: DEFAULT_LOW_CONFIDENCE,
            multi_label: DEFAULT_MULTI_LABEL,
            unknown_label: DEFAULT_UNKNOWN_LABEL,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("ambiguous_closeness", self.ambiguous_closeness),
            ("low_confidence", self.low_confidence),
            ("multi_label", self.multi_label),
            ("unknown_label", self.unknown_label),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(EvalError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Parse JSON, falling back to TOML, then validate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let thresholds: Self = match serde_json::from_slice(bytes) {
            Ok(thresholds) => thresholds,
            Err(json_err) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|err| EvalError::InvalidConfig(format!("{json_err}; {err}")))?;
                toml::from_str(text).map_err(|toml_err| {
                    EvalError::InvalidConfig(format!(
                        "thresholds are not valid JSON ({json_err}) or TOML ({toml_err})"
                    ))
                })?
            }
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|err| {
            EvalError::InvalidConfig(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }
}
