use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("At least one platform must be selected")]
    NoPlatforms,

    #[error("Media plan not found: {0}")]
    PlanNotFound(uuid::Uuid),

    #[error("Placement not found: {0}")]
    PlacementNotFound(uuid::Uuid),

    #[error("Launch blocked: insertion order {io_number} is still in draft")]
    LaunchBlocked { io_number: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
