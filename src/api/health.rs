use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler.
/// Returns JSON with status and config summary. Never exposes secrets.
pub fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let settings = state.llm_settings();
    Json(json!({
        "status": "vocabmeld-relay is running",
        "config": {
            "auth_required": state.auth_required(),
            "api_protocol": settings.protocol.as_setting(),
            "model_name": settings.model_name,
            "configured": settings.ensure_configured().is_ok(),
            "log_level": state.config.features.log_level,
        }
    }))
}
