use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("No valid plan found to reach the resource goal")]
    NoPlanFound,
    #[error("No plan found within the search budget ({expansions} expansions)")]
    BudgetExhausted { expansions: usize },
    #[error("Snapshot has no deposit unit for the planning player")]
    MissingDeposit,
    #[error("Snapshot has no worker units for the planning player")]
    NoWorkers,
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("Action precondition not met: {0}")]
    PreconditionNotMet(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
