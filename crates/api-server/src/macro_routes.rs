//! Macro indicator reads: latest snapshot, dashboard summary, and history.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use hedge_db::MacroData;

use crate::{ApiResponse, AppError, AppState};

const MAX_HISTORY: i64 = 365;
const DEFAULT_METRICS: &str = "dxy,gold,m2";

#[derive(Deserialize, utoipa::IntoParams)]
pub struct MacroHistoryParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub metrics: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct MacroCurrentData {
    pub data: Option<MacroData>,
    pub updated_at: String,
}

pub fn macro_routes() -> Router<AppState> {
    Router::new()
        .route("/macro/current", get(get_current_macro))
        .route("/macro/dashboard", get(get_macro_dashboard))
        .route("/macro/history", get(get_macro_history))
}

#[utoipa::path(
    get,
    path = "/api/v1/macro/current",
    responses((status = 200, description = "Most recent macro snapshot")),
    tag = "Macro"
)]
pub async fn get_current_macro(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MacroCurrentData>>, AppError> {
    let data = state.macros.latest().await?;

    Ok(Json(ApiResponse::success(MacroCurrentData {
        data,
        updated_at: chrono::Utc::now().to_rfc3339(),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/macro/dashboard",
    responses((status = 200, description = "Grouped macro dashboard summary")),
    tag = "Macro"
)]
pub async fn get_macro_dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let latest = state.macros.latest().await?;

    let dashboard = match latest {
        Some(m) => json!({
            "as_of": m.data_date,
            "dxy": {
                "current": m.dxy_value,
                "change_1d": m.dxy_change_1d,
                "change_ytd": m.dxy_change_ytd,
            },
            "metals": {
                "gold": m.gold_price,
                "silver": m.silver_price,
                "platinum": m.platinum_price,
            },
            "commodities": {
                "oil_wti": m.oil_wti_price,
                "copper": m.copper_price,
            },
            "m2": {
                "current": m.m2_supply_trillions,
                "yoy_change": m.m2_yoy_change,
            },
            "rates": {
                "fed_funds": m.fed_funds_rate,
                "ten_year": m.ten_year_yield,
            },
            "inflation": {
                "cpi_yoy": m.cpi_yoy,
                "pce_yoy": m.pce_yoy,
            },
            "updated_at": chrono::Utc::now().to_rfc3339(),
        }),
        None => json!({
            "as_of": null,
            "updated_at": chrono::Utc::now().to_rfc3339(),
        }),
    };

    Ok(Json(ApiResponse::success(dashboard)))
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, AppError> {
    value
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {field}: '{value}' (expected YYYY-MM-DD)")))
}

/// Project one macro row down to the requested metric groups.
fn project_metrics(row: &MacroData, metrics: &[&str]) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    out.insert("data_date".to_string(), json!(row.data_date));

    for metric in metrics {
        match *metric {
            "dxy" => {
                out.insert("dxy_value".to_string(), json!(row.dxy_value));
                out.insert("dxy_change_1d".to_string(), json!(row.dxy_change_1d));
                out.insert("dxy_change_ytd".to_string(), json!(row.dxy_change_ytd));
            }
            "gold" => {
                out.insert("gold_price".to_string(), json!(row.gold_price));
            }
            "silver" => {
                out.insert("silver_price".to_string(), json!(row.silver_price));
            }
            "platinum" => {
                out.insert("platinum_price".to_string(), json!(row.platinum_price));
            }
            "oil" => {
                out.insert("oil_wti_price".to_string(), json!(row.oil_wti_price));
            }
            "copper" => {
                out.insert("copper_price".to_string(), json!(row.copper_price));
            }
            "m2" => {
                out.insert("m2_supply_trillions".to_string(), json!(row.m2_supply_trillions));
                out.insert("m2_yoy_change".to_string(), json!(row.m2_yoy_change));
            }
            "rates" => {
                out.insert("fed_funds_rate".to_string(), json!(row.fed_funds_rate));
                out.insert("ten_year_yield".to_string(), json!(row.ten_year_yield));
            }
            "inflation" => {
                out.insert("cpi_yoy".to_string(), json!(row.cpi_yoy));
                out.insert("pce_yoy".to_string(), json!(row.pce_yoy));
            }
            "fx" => {
                out.insert("eur_usd".to_string(), json!(row.eur_usd));
                out.insert("usd_jpy".to_string(), json!(row.usd_jpy));
                out.insert("gbp_usd".to_string(), json!(row.gbp_usd));
                out.insert("usd_cny".to_string(), json!(row.usd_cny));
            }
            _ => {}
        }
    }

    serde_json::Value::Object(out)
}

#[utoipa::path(
    get,
    path = "/api/v1/macro/history",
    params(MacroHistoryParams),
    responses(
        (status = 200, description = "Macro series over a date range, newest first"),
        (status = 400, description = "Invalid date, metric, or limit"),
    ),
    tag = "Macro"
)]
pub async fn get_macro_history(
    State(state): State<AppState>,
    Query(params): Query<MacroHistoryParams>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let limit = params.limit.unwrap_or(90);
    if !(1..=MAX_HISTORY).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_HISTORY}"
        )));
    }

    let start_date = params
        .start_date
        .as_deref()
        .map(|v| parse_date(v, "start_date"))
        .transpose()?;
    let end_date = params
        .end_date
        .as_deref()
        .map(|v| parse_date(v, "end_date"))
        .transpose()?;

    let metrics_raw = params.metrics.as_deref().unwrap_or(DEFAULT_METRICS);
    let metrics: Vec<&str> = metrics_raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .collect();

    const KNOWN: [&str; 10] = [
        "dxy", "gold", "silver", "platinum", "oil", "copper", "m2", "rates", "inflation", "fx",
    ];
    if let Some(unknown) = metrics.iter().find(|m| !KNOWN.contains(m)) {
        return Err(AppError::BadRequest(format!("Unknown metric '{unknown}'")));
    }

    let rows = state.macros.history(start_date, end_date, limit).await?;
    let data = rows.iter().map(|row| project_metrics(row, &metrics)).collect();

    Ok(Json(ApiResponse::success(data)))
}
