//! HEDGE REST surface: companies, rankings, portfolio analytics, and macro
//! reads over the survival-score store, plus the scheduled background jobs.

pub mod company_routes;
pub mod config;
pub mod jobs;
pub mod macro_routes;
pub mod portfolio_routes;
pub mod ranking_routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use alert_engine::AlertEvaluator;
use batch_scorer::BatchScorer;
use hedge_db::{
    CompanyStore, FundamentalStore, HedgeDb, MacroStore, PortfolioStore, RunStore, ScoreStore,
};
use job_scheduler::{Schedule, Scheduler};
use notification_service::{NotificationConfig, NotificationService};
use portfolio_analytics::PortfolioAnalyzer;
use scoring_engine::WeightVector;

use crate::config::AppConfig;
use crate::jobs::{AlertScanJob, DailyScoringJob};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub companies: CompanyStore,
    pub fundamentals: FundamentalStore,
    pub scores: ScoreStore,
    pub portfolios: PortfolioStore,
    pub macros: MacroStore,
    pub runs: RunStore,
    pub analyzer: PortfolioAnalyzer,
}

impl AppState {
    pub fn new(db: HedgeDb) -> Self {
        Self {
            companies: CompanyStore::new(db.clone()),
            fundamentals: FundamentalStore::new(db.clone()),
            scores: ScoreStore::new(db.clone()),
            portfolios: PortfolioStore::new(db.clone()),
            macros: MacroStore::new(db.clone()),
            runs: RunStore::new(db.clone()),
            analyzer: PortfolioAnalyzer::new(db),
        }
    }
}

/// Standard response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Handler errors, mapped onto the HTTP contract.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Upstream(message) => (StatusCode::BAD_GATEWAY, message.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Liveness probe")),
    tag = "Health"
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub companies_tracked: usize,
    pub last_scoring_run: Option<hedge_db::ScoringRun>,
    pub macro_data_updated: Option<chrono::NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Platform status: universe size, last run, macro freshness")),
    tag = "Health"
)]
async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let companies = state.companies.list_active().await?;
    let last_scoring_run = state.runs.latest().await?;
    let macro_data_updated = state.macros.latest().await?.map(|m| m.data_date);

    Ok(Json(StatusResponse {
        companies_tracked: companies.len(),
        last_scoring_run,
        macro_data_updated,
    }))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        status,
        company_routes::list_companies,
        company_routes::get_company,
        company_routes::get_company_scores,
        ranking_routes::get_rankings,
        ranking_routes::get_movers,
        ranking_routes::get_tier_distribution,
        portfolio_routes::analyze_portfolio,
        portfolio_routes::run_scenario,
        macro_routes::get_current_macro,
        macro_routes::get_macro_dashboard,
        macro_routes::get_macro_history,
    ),
    components(schemas(portfolio_routes::ScenarioRequest)),
    tags(
        (name = "Health"),
        (name = "Companies"),
        (name = "Rankings"),
        (name = "Portfolio"),
        (name = "Macro"),
    )
)]
struct ApiDoc;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .merge(company_routes::company_routes())
        .merge(ranking_routes::ranking_routes())
        .merge(portfolio_routes::portfolio_routes())
        .merge(macro_routes::macro_routes());

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .nest("/api/v1", v1)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=info,batch_scorer=info,alert_engine=info".into()),
        )
        .init();

    // Bad weight tables are a programming error; refuse to serve scores
    // computed from them.
    WeightVector::validate_all()?;

    let config = AppConfig::from_env();
    tracing::info!("Connecting to database at {}", config.database_url);
    let db = HedgeDb::new(&config.database_url).await?;

    let notifications = Arc::new(NotificationService::new(&NotificationConfig::from_env()));

    let scheduler_handle = if config.enable_scheduler {
        let scorer = BatchScorer::new(db.clone());
        let evaluator = Arc::new(AlertEvaluator::new(db.clone(), notifications));

        let handle = Scheduler::new(4)
            .register(
                Schedule::DailyAt {
                    hour: 6,
                    minute: 0,
                    tz: chrono_tz::America::New_York,
                },
                Arc::new(DailyScoringJob::new(scorer)),
            )
            .register(
                Schedule::Every(Duration::from_secs(5 * 60)),
                Arc::new(AlertScanJob::new(evaluator)),
            )
            .spawn();
        tracing::info!("Background scheduler started (daily scoring, alert scan)");
        Some(handle)
    } else {
        None
    };

    let app = build_router(AppState::new(db));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("HEDGE API listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    if let Some(handle) = scheduler_handle {
        handle.shutdown();
    }

    Ok(())
}
