//! Campaign Planner — media plan generation, editing and IO export service.
//!
//! `serve` runs the REST API; `plan` prints a one-off plan to stdout.

use campaign_api::{ApiServer, AppState};
use campaign_core::config::AppConfig;
use campaign_core::types::{
    AudiencePersona, BudgetDescriptor, BudgetType, CampaignData, CreativeDescriptor,
};
use campaign_media_plan::{export_csv, AllocationTables, BudgetAllocator};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-planner")]
#[command(about = "Marketing campaign planner and media plan engine")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short, env = "CAMPAIGN_PLANNER_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// HTTP port (overrides config)
        #[arg(long, env = "CAMPAIGN_PLANNER__API__HTTP_PORT")]
        http_port: Option<u16>,

        /// Node identifier (overrides config)
        #[arg(long, env = "CAMPAIGN_PLANNER__NODE_ID")]
        node_id: Option<String>,
    },
    /// Generate a plan and print it
    Plan {
        /// Campaign JSON file; takes precedence over the flags below
        #[arg(long)]
        input: Option<String>,

        #[arg(long, default_value = "")]
        industry: String,

        #[arg(long, default_value = "")]
        objective: String,

        /// Comma-separated platform ids
        #[arg(long, value_delimiter = ',')]
        platforms: Vec<String>,

        #[arg(long, default_value_t = 0.0)]
        budget: f64,

        /// Treat the budget as a daily amount
        #[arg(long, default_value_t = false)]
        daily: bool,

        /// Flight length in days (defaults to planner.default_duration_days)
        #[arg(long)]
        duration: Option<u32>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "campaign_planner=info,campaign_api=info,campaign_media_plan=info,\
                     campaign_advisor=info,tower_http=info"
                        .into()
                }),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    let tables = Arc::new(load_tables(&config)?);

    match cli.command.unwrap_or(Command::Serve {
        http_port: None,
        node_id: None,
    }) {
        Command::Serve { http_port, node_id } => serve(config, tables, http_port, node_id).await,
        Command::Plan {
            input,
            industry,
            objective,
            platforms,
            budget,
            daily,
            duration,
            format,
        } => {
            let data = match input {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                None => CampaignData {
                    website_url: String::new(),
                    industry,
                    objective,
                    platforms,
                    audience_persona: AudiencePersona::default(),
                    budget: BudgetDescriptor {
                        amount: budget,
                        budget_type: if daily { BudgetType::Daily } else { BudgetType::Total },
                        duration,
                        countries: Vec::new(),
                        regions: Vec::new(),
                    },
                    creative: CreativeDescriptor::default(),
                },
            };
            print_plan(&config, tables, &data, format)
        }
    }
}

fn load_tables(config: &AppConfig) -> anyhow::Result<AllocationTables> {
    match &config.planner.tables_path {
        Some(path) => Ok(AllocationTables::from_file(path)?),
        None => Ok(AllocationTables::builtin()),
    }
}

async fn serve(
    mut config: AppConfig,
    tables: Arc<AllocationTables>,
    http_port: Option<u16>,
    node_id: Option<String>,
) -> anyhow::Result<()> {
    if let Some(port) = http_port {
        config.api.http_port = port;
    }
    if let Some(node_id) = node_id {
        config.node_id = node_id;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        model = %config.llm.model,
        "Campaign Planner starting up"
    );

    let state = AppState::from_config(&config, tables)?;
    state.users.initialize().await?;
    let api_server = ApiServer::new(config.clone(), state);

    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics().await {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("Campaign Planner is ready to serve traffic");

    api_server.start_http().await?;

    Ok(())
}

fn print_plan(
    config: &AppConfig,
    tables: Arc<AllocationTables>,
    data: &CampaignData,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let plan = BudgetAllocator::new(tables)
        .with_default_flight_days(config.planner.default_duration_days)
        .generate_plan(data, None)?;
    match format {
        OutputFormat::Csv => print!("{}", export_csv(&plan.placements)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }
    Ok(())
}
