//! Ranking, mover, and tier-distribution endpoints.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use hedge_db::{CompanyWithScore, ScoreMover};
use scoring_engine::{Scenario, Tier};

use crate::{ApiResponse, AppError, AppState};

const MAX_RANKINGS: i64 = 500;
const MAX_MOVERS: i64 = 50;

#[derive(Deserialize, utoipa::IntoParams)]
pub struct RankingsParams {
    pub scenario: Option<String>,
    pub sector: Option<String>,
    pub tier: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub score: Option<f64>,
    pub total_score: Option<f64>,
    pub tier: Option<String>,
}

#[derive(Serialize)]
pub struct RankingsData {
    pub scenario: String,
    pub generated_at: String,
    pub total_analyzed: usize,
    pub rankings: Vec<RankingEntry>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct MoversParams {
    pub period: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct MoversData {
    pub period: String,
    pub gainers: Vec<ScoreMover>,
    pub losers: Vec<ScoreMover>,
}

#[derive(Serialize)]
pub struct TierBucket {
    pub tier: String,
    pub min: f64,
    pub max: f64,
    pub count: i64,
}

pub fn ranking_routes() -> Router<AppState> {
    Router::new()
        .route("/rankings", get(get_rankings))
        .route("/rankings/movers", get(get_movers))
        .route("/rankings/tiers", get(get_tier_distribution))
}

fn scenario_value(row: &CompanyWithScore, scenario: Scenario) -> Option<f64> {
    match scenario {
        Scenario::Current => row.total_score,
        Scenario::Gradual => row.scenario_gradual,
        Scenario::Rapid => row.scenario_rapid,
        Scenario::Hyper => row.scenario_hyper,
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/rankings",
    params(RankingsParams),
    responses(
        (status = 200, description = "Companies ranked by the chosen scenario score"),
        (status = 400, description = "Unknown scenario or tier"),
    ),
    tag = "Rankings"
)]
pub async fn get_rankings(
    State(state): State<AppState>,
    Query(params): Query<RankingsParams>,
) -> Result<Json<ApiResponse<RankingsData>>, AppError> {
    let scenario = match params.scenario.as_deref() {
        None => Scenario::Current,
        Some(value) => Scenario::parse(value)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown scenario '{value}'")))?,
    };
    let limit = params.limit.unwrap_or(100);
    if !(1..=MAX_RANKINGS).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_RANKINGS}"
        )));
    }
    let tier = params
        .tier
        .as_deref()
        .map(|value| {
            Tier::parse(value)
                .map(|t| t.as_str().to_string())
                .ok_or_else(|| AppError::BadRequest(format!("Unknown tier '{value}'")))
        })
        .transpose()?;

    let rows = state
        .scores
        .rankings(scenario.as_str(), params.sector.as_deref(), tier.as_deref(), limit)
        .await?;

    let rankings: Vec<RankingEntry> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| RankingEntry {
            rank: i + 1,
            ticker: row.ticker.clone(),
            name: row.name.clone(),
            sector: row.sector.clone(),
            score: scenario_value(row, scenario),
            total_score: row.total_score,
            tier: row.tier.clone(),
        })
        .collect();

    Ok(Json(ApiResponse::success(RankingsData {
        scenario: scenario.as_str().to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        total_analyzed: rankings.len(),
        rankings,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/rankings/movers",
    params(MoversParams),
    responses(
        (status = 200, description = "Top score gainers and losers over the period"),
        (status = 400, description = "Invalid period"),
    ),
    tag = "Rankings"
)]
pub async fn get_movers(
    State(state): State<AppState>,
    Query(params): Query<MoversParams>,
) -> Result<Json<ApiResponse<MoversData>>, AppError> {
    let period = params.period.as_deref().unwrap_or("1d");
    let days = match period {
        "1d" => 1,
        "7d" => 7,
        "30d" => 30,
        other => {
            return Err(AppError::BadRequest(format!(
                "period must be 1d, 7d or 30d, got '{other}'"
            )))
        }
    };
    let limit = params.limit.unwrap_or(20);
    if !(1..=MAX_MOVERS).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_MOVERS}"
        )));
    }

    // Sorted by delta descending.
    let movers = state.scores.movers(days).await?;

    let gainers: Vec<ScoreMover> = movers
        .iter()
        .filter(|m| m.delta > 0.0)
        .take(limit as usize)
        .cloned()
        .collect();
    let losers: Vec<ScoreMover> = movers
        .iter()
        .rev()
        .filter(|m| m.delta < 0.0)
        .take(limit as usize)
        .cloned()
        .collect();

    Ok(Json(ApiResponse::success(MoversData {
        period: period.to_string(),
        gainers,
        losers,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/rankings/tiers",
    responses((status = 200, description = "Company count per tier over latest scores")),
    tag = "Rankings"
)]
pub async fn get_tier_distribution(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TierBucket>>>, AppError> {
    let counts = state.scores.tier_distribution().await?;

    let buckets: Vec<TierBucket> = Tier::ALL
        .iter()
        .map(|tier| {
            let count = counts
                .iter()
                .find(|c| c.tier.as_deref() == Some(tier.as_str()))
                .map(|c| c.count)
                .unwrap_or(0);
            let (min, max) = tier.bounds();
            TierBucket {
                tier: tier.as_str().to_string(),
                min: min.to_f64().unwrap_or(0.0),
                max: max.to_f64().unwrap_or(100.0),
                count,
            }
        })
        .collect();

    Ok(Json(ApiResponse::success(buckets)))
}
