//! Model and style catalog.
//!
//! The catalog is an immutable value built once at startup (from the
//! built-in table or a JSON file) and shared by reference with everything
//! that validates or executes generation requests.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::quality::QualityTier;

/// Configuration for one inference model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Stable identifier used in requests (e.g. `"turbo"`).
    pub key: String,
    pub display_name: String,
    /// Inference endpoint that accepts the JSON generation payload.
    pub endpoint_url: String,
    pub allowed_qualities: Vec<QualityTier>,
    pub default_steps: u32,
    /// Appended to every prompt sent to this model.
    #[serde(default)]
    pub prompt_suffix: Option<String>,
    /// Premium models are only available to premium accounts.
    #[serde(default)]
    pub premium: bool,
}

impl ModelConfig {
    pub fn allows(&self, quality: QualityTier) -> bool {
        self.allowed_qualities.contains(&quality)
    }
}

/// A prompt style preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub key: String,
    pub display_name: String,
    pub prompt_suffix: String,
}

/// The full set of models and styles offered by the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub models: Vec<ModelConfig>,
    #[serde(default)]
    pub styles: Vec<StyleConfig>,
}

const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";

impl Default for ModelCatalog {
    fn default() -> Self {
        use QualityTier::{Hd, HdPlus, Sd, UltraHd};

        let model = |key: &str,
                     name: &str,
                     repo: &str,
                     qualities: &[QualityTier],
                     steps: u32,
                     suffix: Option<&str>,
                     premium: bool| ModelConfig {
            key: key.to_string(),
            display_name: name.to_string(),
            endpoint_url: format!("{HF_INFERENCE_BASE}/{repo}"),
            allowed_qualities: qualities.to_vec(),
            default_steps: steps,
            prompt_suffix: suffix.map(str::to_string),
            premium,
        };
        let style = |key: &str, name: &str, suffix: &str| StyleConfig {
            key: key.to_string(),
            display_name: name.to_string(),
            prompt_suffix: suffix.to_string(),
        };

        Self {
            models: vec![
                model("turbo", "SDXL Turbo", "stabilityai/sdxl-turbo", &[Sd, Hd], 4, None, false),
                model(
                    "flux",
                    "FLUX.1 Schnell",
                    "black-forest-labs/FLUX.1-schnell",
                    &[Sd, Hd, HdPlus, UltraHd],
                    4,
                    None,
                    false,
                ),
                model(
                    "realism",
                    "RealVis XL",
                    "SG161222/RealVisXL_V4.0",
                    &[Sd, Hd, HdPlus],
                    30,
                    Some("photorealistic, highly detailed, sharp focus"),
                    false,
                ),
                model(
                    "flux-dev",
                    "FLUX.1 Dev",
                    "black-forest-labs/FLUX.1-dev",
                    &[Hd, HdPlus, UltraHd],
                    28,
                    None,
                    true,
                ),
            ],
            styles: vec![
                style("cinematic", "Cinematic", "cinematic lighting, film grain, dramatic composition"),
                style("anime", "Anime", "anime style, vibrant colors, clean line art"),
                style("watercolor", "Watercolor", "watercolor painting, soft edges, paper texture"),
                style("pixel-art", "Pixel Art", "pixel art, 16-bit, limited palette"),
                style("3d-render", "3D Render", "3d render, octane, global illumination"),
            ],
        }
    }
}

impl ModelCatalog {
    /// Parse and validate a catalog from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let catalog: ModelCatalog = serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Invalid model catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check internal consistency: unique keys, a non-empty quality set and
    /// a positive default step count for every model.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.models.is_empty() {
            return Err(CoreError::Validation(
                "Model catalog must define at least one model".to_string(),
            ));
        }
        for (i, m) in self.models.iter().enumerate() {
            if self.models[..i].iter().any(|other| other.key == m.key) {
                return Err(CoreError::Validation(format!("Duplicate model key '{}'", m.key)));
            }
            if m.allowed_qualities.is_empty() {
                return Err(CoreError::Validation(format!(
                    "Model '{}' must allow at least one quality tier",
                    m.key
                )));
            }
            if m.default_steps == 0 {
                return Err(CoreError::Validation(format!(
                    "Model '{}' must have a positive default step count",
                    m.key
                )));
            }
        }
        for (i, s) in self.styles.iter().enumerate() {
            if self.styles[..i].iter().any(|other| other.key == s.key) {
                return Err(CoreError::Validation(format!("Duplicate style key '{}'", s.key)));
            }
        }
        Ok(())
    }

    pub fn model(&self, key: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.key == key)
    }

    pub fn style(&self, key: &str) -> Option<&StyleConfig> {
        self.styles.iter().find(|s| s.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        ModelCatalog::default().validate().unwrap();
    }

    #[test]
    fn turbo_only_allows_sd_and_hd() {
        let catalog = ModelCatalog::default();
        let turbo = catalog.model("turbo").unwrap();
        assert!(turbo.allows(QualityTier::Sd));
        assert!(turbo.allows(QualityTier::Hd));
        assert!(!turbo.allows(QualityTier::HdPlus));
        assert!(!turbo.allows(QualityTier::UltraHd));
    }

    #[test]
    fn json_catalog_round_trips_through_validation() {
        let json = r#"{
            "models": [{
                "key": "tiny",
                "display_name": "Tiny",
                "endpoint_url": "http://localhost:9000/tiny",
                "allowed_qualities": ["SD"],
                "default_steps": 8
            }]
        }"#;
        let catalog = ModelCatalog::from_json_str(json).unwrap();
        let tiny = catalog.model("tiny").unwrap();
        assert!(!tiny.premium);
        assert_eq!(tiny.prompt_suffix, None);
        assert!(catalog.styles.is_empty());
    }

    #[test]
    fn duplicate_model_keys_rejected() {
        let mut catalog = ModelCatalog::default();
        catalog.models.push(catalog.models[0].clone());
        let msg = catalog.validate().unwrap_err().to_string();
        assert!(msg.contains("Duplicate model key"));
    }

    #[test]
    fn empty_quality_set_rejected() {
        let mut catalog = ModelCatalog::default();
        catalog.models[0].allowed_qualities.clear();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(ModelCatalog::from_json_str("{ not json").is_err());
    }
}
