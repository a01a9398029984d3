use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input required")]
    EmptyInput,
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("{action} intent missing {arg}")]
    MissingArgument { action: String, arg: &'static str },

    #[error("invalid plan JSON: {0}")]
    PlanJson(#[from] serde_json::Error),
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("command {index} blocked: {reason}")]
    UnsafeCommand { index: usize, reason: String },

    #[error("high-risk command blocked; rerun with --yes to override")]
    HighRiskBlocked,
    #[error("aborted by user")]
    Aborted,

    #[error("step {step} failed: {source}")]
    StepFailed {
        step: usize,
        #[source]
        source: io::Error,
    },

    #[error("history store: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("config: {0}")]
    Config(String),
    #[error("config parse: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("config write: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("planner: {0}")]
    Provider(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
