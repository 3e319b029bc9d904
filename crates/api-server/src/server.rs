//! API server — builds shared state, mounts every route and serves HTTP.

use crate::pg_users::PgUserStore;
use crate::rest::{self, AppState};
use crate::store::{InMemoryUserStore, PlanStore, UserStore};
use crate::{advisor_rest, database_rest, plan_rest};
use axum::routing::{get, post, put};
use axum::Router;
use campaign_advisor::{OpenAiAdvisor, PlanGenerator, ScrapeClient};
use campaign_core::config::AppConfig;
use campaign_media_plan::{AllocationTables, BudgetAllocator};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

impl AppState {
    /// Wire the stores, advisor and scraper from configuration. Call
    /// `users.initialize()` before serving.
    pub fn from_config(config: &AppConfig, tables: Arc<AllocationTables>) -> anyhow::Result<Self> {
        let advisor = Arc::new(OpenAiAdvisor::new(&config.llm)?);
        let allocator = BudgetAllocator::new(tables)
            .with_default_flight_days(config.planner.default_duration_days);
        let generator = PlanGenerator::new(advisor, allocator);

        let users: Arc<dyn UserStore> = match &config.database.url {
            Some(url) => {
                info!("Users stored in Postgres");
                Arc::new(PgUserStore::connect_lazy(url, &config.database)?)
            }
            None => {
                info!("No database configured, users kept in memory");
                Arc::new(InMemoryUserStore::new())
            }
        };

        Ok(Self {
            plans: Arc::new(PlanStore::new(config.planner.max_stored_plans)),
            users,
            generator: Arc::new(generator),
            scraper: Arc::new(ScrapeClient::new(&config.scraper)?),
            node_id: config.node_id.clone(),
            start_time: Instant::now(),
        })
    }
}

/// Every REST route with its middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Media plans
        .route(
            "/api/v1/media-plans",
            get(plan_rest::list_plans).post(plan_rest::create_plan),
        )
        .route(
            "/api/v1/media-plans/:id",
            get(plan_rest::get_plan).delete(plan_rest::delete_plan),
        )
        .route(
            "/api/v1/media-plans/:id/regenerate",
            post(plan_rest::regenerate_plan),
        )
        .route(
            "/api/v1/media-plans/:id/placements",
            post(plan_rest::add_placement),
        )
        .route(
            "/api/v1/media-plans/:id/placements/:placement_id",
            put(plan_rest::update_placement).delete(plan_rest::delete_placement),
        )
        .route(
            "/api/v1/media-plans/:id/io-status",
            put(plan_rest::set_io_status),
        )
        .route(
            "/api/v1/media-plans/:id/launch",
            post(plan_rest::launch_plan),
        )
        .route(
            "/api/v1/media-plans/:id/export.csv",
            get(plan_rest::export_csv),
        )
        .route(
            "/api/v1/media-plans/:id/io-document",
            get(plan_rest::io_document),
        )
        .route(
            "/api/v1/media-plans/:id/forecast",
            get(plan_rest::plan_forecast),
        )
        // Advisor and collaborator proxies
        .route("/api/generate-plan", post(advisor_rest::generate_plan))
        .route("/api/personas", post(advisor_rest::generate_personas))
        .route("/api/scrape", post(advisor_rest::scrape))
        .route("/api/database", post(database_rest::handle_database))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main API server.
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
