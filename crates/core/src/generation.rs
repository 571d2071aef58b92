//! Generation request validation and inference payload construction.
//!
//! [`GenerationParams`] is what a client submits. [`validate_request`]
//! resolves it against the [`ModelCatalog`] into an immutable
//! [`GenerationRequest`], and [`build_payload`] turns that into the JSON body
//! the inference endpoint expects.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::catalog::ModelCatalog;
use crate::dimensions::{self, find_aspect_ratio, Dimensions};
use crate::error::CoreError;
use crate::quality::QualityTier;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Longest prompt accepted, in characters.
pub const MAX_PROMPT_CHARS: u64 = 2000;
/// Upper bound on diffusion steps for any model.
pub const MAX_STEPS: u32 = 150;

// ---------------------------------------------------------------------------
// Client input
// ---------------------------------------------------------------------------

/// Generation parameters as submitted by a client (or pre-filled by remix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GenerationParams {
    #[validate(length(max = 2000, message = "prompt must be at most 2000 characters"))]
    pub prompt: String,
    pub model: String,
    #[serde(default)]
    pub style: Option<String>,
    pub quality: QualityTier,
    /// Aspect ratio key; when set, `width`/`height` are ignored.
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 1, max = 150, message = "steps must be between 1 and 150"))]
    pub steps: Option<u32>,
    #[serde(default)]
    pub is_private: bool,
}

// ---------------------------------------------------------------------------
// Validated request
// ---------------------------------------------------------------------------

/// A validated, immutable generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub style: Option<String>,
    pub quality: QualityTier,
    pub aspect_ratio: Option<String>,
    pub dimensions: Dimensions,
    pub seed: u32,
    pub steps: u32,
    pub is_private: bool,
}

impl GenerationRequest {
    /// Credits this request costs.
    pub fn cost(&self) -> i32 {
        self.quality.cost()
    }
}

/// Validate client parameters against the catalog.
///
/// Checks, in order: field limits, non-empty prompt, known model, premium
/// access, quality allowed for the model, known style, known aspect ratio.
/// No credits or network are involved, so a failure here is always free.
pub fn validate_request(
    params: &GenerationParams,
    catalog: &ModelCatalog,
    premium_allowed: bool,
) -> Result<GenerationRequest, CoreError> {
    params
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    let prompt = params.prompt.trim();
    if prompt.is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }

    let model = catalog.model(&params.model).ok_or_else(|| {
        CoreError::Validation(format!("Unknown model '{}'", params.model))
    })?;

    if model.premium && !premium_allowed {
        return Err(CoreError::Forbidden(format!(
            "Model '{}' requires a premium account",
            model.key
        )));
    }

    if !model.allows(params.quality) {
        return Err(CoreError::Validation(format!(
            "Quality {} is not available for model '{}'. Allowed: {}",
            params.quality,
            model.key,
            model
                .allowed_qualities
                .iter()
                .map(|q| q.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    if let Some(style) = params.style.as_deref() {
        if catalog.style(style).is_none() {
            return Err(CoreError::Validation(format!("Unknown style '{style}'")));
        }
    }

    if let Some(key) = params.aspect_ratio.as_deref() {
        if find_aspect_ratio(key).is_none() {
            return Err(CoreError::Validation(format!("Unknown aspect ratio '{key}'")));
        }
    }

    let max = params.quality.max_dimension();
    let dimensions = dimensions::compute(
        params.aspect_ratio.is_some(),
        params.aspect_ratio.as_deref(),
        params.width.unwrap_or(max),
        params.height.unwrap_or(max),
        max,
    );

    Ok(GenerationRequest {
        prompt: prompt.to_string(),
        model: model.key.clone(),
        style: params.style.clone(),
        quality: params.quality,
        aspect_ratio: params.aspect_ratio.clone(),
        dimensions,
        seed: params.seed.unwrap_or_else(rand::random),
        steps: params.steps.unwrap_or(model.default_steps).min(MAX_STEPS),
        is_private: params.is_private,
    })
}

// ---------------------------------------------------------------------------
// Inference payload
// ---------------------------------------------------------------------------

/// JSON body posted to an inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferencePayload {
    pub inputs: String,
    pub parameters: InferenceParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferenceParameters {
    pub seed: u32,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
}

/// Build the inference payload: the prompt followed by the style suffix and
/// the model suffix, each comma-separated.
pub fn build_payload(request: &GenerationRequest, catalog: &ModelCatalog) -> InferencePayload {
    let mut inputs = request.prompt.clone();

    let style_suffix = request
        .style
        .as_deref()
        .and_then(|key| catalog.style(key))
        .map(|s| s.prompt_suffix.as_str());
    let model_suffix = catalog
        .model(&request.model)
        .and_then(|m| m.prompt_suffix.as_deref());

    for suffix in [style_suffix, model_suffix].into_iter().flatten() {
        if !suffix.is_empty() {
            inputs.push_str(", ");
            inputs.push_str(suffix);
        }
    }

    InferencePayload {
        inputs,
        parameters: InferenceParameters {
            seed: request.seed,
            width: request.dimensions.width,
            height: request.dimensions.height,
            num_inference_steps: request.steps,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
