//! Portfolio analysis and scenario projection endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use portfolio_analytics::{PortfolioAnalysis, ScenarioOverrides, ScenarioProjection};
use scoring_engine::Scenario;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ScenarioRequest {
    /// One of gradual, rapid, hyper.
    pub scenario: String,
    #[schema(value_type = Option<Object>)]
    pub custom_params: Option<ScenarioOverrides>,
}

pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/portfolio/:id/analyze", get(analyze_portfolio))
        .route("/portfolio/:id/scenario", post(run_scenario))
}

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/{id}/analyze",
    params(("id" = String, Path, description = "Portfolio id")),
    responses(
        (status = 200, description = "Value-weighted portfolio analysis"),
        (status = 404, description = "Unknown portfolio"),
    ),
    tag = "Portfolio"
)]
pub async fn analyze_portfolio(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PortfolioAnalysis>>, AppError> {
    let portfolio = state
        .portfolios
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Portfolio {id} not found")))?;

    let analysis = state.analyzer.analyze(&portfolio).await?;
    Ok(Json(ApiResponse::success(analysis)))
}

#[utoipa::path(
    post,
    path = "/api/v1/portfolio/{id}/scenario",
    params(("id" = String, Path, description = "Portfolio id")),
    request_body = ScenarioRequest,
    responses(
        (status = 200, description = "Projected nominal and real value under the scenario"),
        (status = 400, description = "Unknown scenario"),
        (status = 404, description = "Unknown portfolio"),
    ),
    tag = "Portfolio"
)]
pub async fn run_scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ScenarioRequest>,
) -> Result<Json<ApiResponse<ScenarioProjection>>, AppError> {
    let scenario = Scenario::parse(&request.scenario)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown scenario '{}'", request.scenario)))?;

    let portfolio = state
        .portfolios
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Portfolio {id} not found")))?;

    let projection = state
        .analyzer
        .project_scenario(&portfolio, scenario, request.custom_params)
        .await?;

    Ok(Json(ApiResponse::success(projection)))
}
