//! Company list, detail, and score-history endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use hedge_db::companies::{CompanyListQuery, CompanySort};
use hedge_db::{Company, CompanyWithScore, Fundamental, SurvivalScore};
use scoring_engine::Tier;

use crate::{ApiResponse, AppError, AppState};

const MAX_PAGE_SIZE: i64 = 100;
const MAX_HISTORY: i64 = 365;

#[derive(Deserialize, utoipa::IntoParams)]
pub struct CompanyListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sector: Option<String>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub tier: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Serialize)]
pub struct CompanyListData {
    pub companies: Vec<CompanyWithScore>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct CompanyDetail {
    pub company: Company,
    pub latest_score: Option<SurvivalScore>,
    pub latest_fundamental: Option<Fundamental>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ScoreHistoryParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ScoreHistoryData {
    pub ticker: String,
    pub scores: Vec<SurvivalScore>,
}

pub fn company_routes() -> Router<AppState> {
    Router::new()
        .route("/companies", get(list_companies))
        .route("/companies/:ticker", get(get_company))
        .route("/companies/:ticker/scores", get(get_company_scores))
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, AppError> {
    value
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {field}: '{value}' (expected YYYY-MM-DD)")))
}

fn validate_tier(value: &str) -> Result<&'static str, AppError> {
    Tier::parse(value)
        .map(|t| t.as_str())
        .ok_or_else(|| AppError::BadRequest(format!("Unknown tier '{value}'")))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies",
    params(CompanyListParams),
    responses(
        (status = 200, description = "Paginated companies joined with latest scores"),
        (status = 400, description = "Invalid filter or sort parameter"),
    ),
    tag = "Companies"
)]
pub async fn list_companies(
    State(state): State<AppState>,
    Query(params): Query<CompanyListParams>,
) -> Result<Json<ApiResponse<CompanyListData>>, AppError> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::BadRequest("page must be >= 1".to_string()));
    }
    let limit = params.limit.unwrap_or(50);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    for (name, value) in [("min_score", params.min_score), ("max_score", params.max_score)] {
        if let Some(v) = value {
            if !(0.0..=100.0).contains(&v) {
                return Err(AppError::BadRequest(format!("{name} must be in [0, 100]")));
            }
        }
    }

    let sort = match params.sort_by.as_deref() {
        None => CompanySort::Score,
        Some(value) => CompanySort::parse(value)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown sort key '{value}'")))?,
    };
    let sort_desc = match params.sort_order.as_deref() {
        None | Some("desc") => true,
        Some("asc") => false,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "sort_order must be asc or desc, got '{other}'"
            )))
        }
    };
    let tier = params
        .tier
        .as_deref()
        .map(validate_tier)
        .transpose()?
        .map(str::to_string);

    let query = CompanyListQuery {
        sector: params.sector,
        tier,
        min_score: params.min_score,
        max_score: params.max_score,
        search: params.search,
        sort: Some(sort),
        sort_desc,
        limit,
        offset: (page - 1) * limit,
    };

    let companies = state.companies.list_with_scores(&query).await?;
    let total = state.companies.count_with_scores(&query).await?;
    let pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(CompanyListData {
        companies,
        pagination: Pagination {
            page,
            limit,
            total,
            pages,
        },
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies/{ticker}",
    params(("ticker" = String, Path, description = "Stock ticker symbol")),
    responses(
        (status = 200, description = "Company detail with latest score and fundamentals"),
        (status = 404, description = "Unknown ticker"),
    ),
    tag = "Companies"
)]
pub async fn get_company(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<CompanyDetail>>, AppError> {
    let ticker = ticker.to_uppercase();
    let company = state
        .companies
        .get_by_ticker(&ticker)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {ticker} not found")))?;

    let latest_score = state.scores.latest_for_company(&company.id).await?;
    let latest_fundamental = state.fundamentals.latest_for_company(&company.id).await?;

    Ok(Json(ApiResponse::success(CompanyDetail {
        company,
        latest_score,
        latest_fundamental,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies/{ticker}/scores",
    params(("ticker" = String, Path, description = "Stock ticker symbol"), ScoreHistoryParams),
    responses(
        (status = 200, description = "Score history, newest first"),
        (status = 400, description = "Invalid date or limit"),
        (status = 404, description = "Unknown ticker"),
    ),
    tag = "Companies"
)]
pub async fn get_company_scores(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<ScoreHistoryParams>,
) -> Result<Json<ApiResponse<ScoreHistoryData>>, AppError> {
    let ticker = ticker.to_uppercase();
    let company = state
        .companies
        .get_by_ticker(&ticker)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {ticker} not found")))?;

    let limit = params.limit.unwrap_or(30);
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

    let scores = state
        .scores
        .history_for_company(&company.id, start_date, end_date, limit)
        .await?;

    Ok(Json(ApiResponse::success(ScoreHistoryData {
        ticker,
        scores,
    })))
}
