use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("price series is empty")]
    EmptySeries,

    #[error("malformed price point at index {index}: {reason}")]
    MalformedInput { index: usize, reason: String },

    #[error("price series is not chronological at index {index}: {current} does not follow {previous}")]
    NonChronological {
        index: usize,
        previous: String,
        current: String,
    },

    #[error("{feature} needs at least {required} data points, got {actual}")]
    InsufficientData {
        feature: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn insufficient(feature: &'static str, required: usize, actual: usize) -> Self {
        AnalysisError::InsufficientData {
            feature,
            required,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
