use axum::{extract::State, routing::get, Json, Router};
use ddam_core::config::Branding;

use crate::app_state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(get_branding))
}

async fn get_branding(State(app_state): State<SharedState>) -> Json<Branding> {
    Json(app_state.config.branding.clone())
}
