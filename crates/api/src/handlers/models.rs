//! Handler for the public model catalog.

use axum::extract::State;
use axum::Json;
use pixora_core::catalog::StyleConfig;
use pixora_core::dimensions::{AspectRatio, ASPECT_RATIOS};
use pixora_core::quality::{QualityTier, ALL_TIERS};
use serde::Serialize;

use crate::response::DataResponse;
use crate::state::AppState;

/// A model as shown to clients. Endpoint URLs stay server-side.
#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub key: String,
    pub display_name: String,
    pub allowed_qualities: Vec<QualityTier>,
    pub default_steps: u32,
    pub premium: bool,
}

#[derive(Debug, Serialize)]
pub struct QualitySummary {
    pub tier: QualityTier,
    pub cost: i32,
    pub max_dimension: u32,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub models: Vec<ModelSummary>,
    pub styles: Vec<StyleConfig>,
    pub aspect_ratios: &'static [AspectRatio],
    pub qualities: Vec<QualitySummary>,
}

/// GET /api/v1/models
pub async fn get_catalog(State(state): State<AppState>) -> Json<DataResponse<CatalogResponse>> {
    let models = state
        .catalog
        .models
        .iter()
        .map(|m| ModelSummary {
            key: m.key.clone(),
            display_name: m.display_name.clone(),
            allowed_qualities: m.allowed_qualities.clone(),
            default_steps: m.default_steps,
            premium: m.premium,
        })
        .collect();

    let qualities = ALL_TIERS
        .iter()
        .map(|&tier| QualitySummary {
            tier,
            cost: tier.cost(),
            max_dimension: tier.max_dimension(),
        })
        .collect();

    Json(DataResponse {
        data: CatalogResponse {
            models,
            styles: state.catalog.styles.clone(),
            aspect_ratios: ASPECT_RATIOS,
            qualities,
        },
    })
}
