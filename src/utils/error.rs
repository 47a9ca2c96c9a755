use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid file pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Question generation failed: {message}")]
    GenerationError { message: String },

    #[error("Question store error: {message}")]
    StoreError { message: String },

    #[error("Content lint failed with {errors} error(s)")]
    LintError { errors: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Generation,
    Storage,
    Data,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl QuizError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            QuizError::ConfigError { .. }
            | QuizError::MissingConfigError { .. }
            | QuizError::InvalidConfigValueError { .. }
            | QuizError::PatternError(_) => ErrorCategory::Configuration,
            QuizError::ApiError(_) => ErrorCategory::Network,
            QuizError::GenerationError { .. } => ErrorCategory::Generation,
            QuizError::IoError(_) | QuizError::ZipError(_) | QuizError::StoreError { .. } => {
                ErrorCategory::Storage
            }
            QuizError::SerializationError(_) | QuizError::CsvError(_) => ErrorCategory::Data,
            QuizError::LintError { .. } => ErrorCategory::Content,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Generation => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data | ErrorCategory::Content => {
                ErrorSeverity::High
            }
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            QuizError::ApiError(_) => {
                "Check network access and the generator endpoint, then rerun; existing banks are kept"
            }
            QuizError::GenerationError { .. } => {
                "Check the API key and model name, or lower questions_per_document"
            }
            QuizError::MissingConfigError { .. } => {
                "Set the missing value in the config file or through the environment"
            }
            QuizError::ConfigError { .. }
            | QuizError::InvalidConfigValueError { .. }
            | QuizError::PatternError(_) => "Fix the configuration value and rerun",
            QuizError::IoError(_) | QuizError::ZipError(_) => {
                "Check that the paths exist and are writable"
            }
            QuizError::StoreError { .. } => {
                "Check the store connection settings and credentials"
            }
            QuizError::SerializationError(_) | QuizError::CsvError(_) => {
                "Inspect the offending JSON/CSV file; it may be truncated or hand-edited"
            }
            QuizError::LintError { .. } => "Fix the reported pages and run lint again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            QuizError::ApiError(e) if e.is_timeout() => {
                "The model endpoint timed out".to_string()
            }
            QuizError::ApiError(e) if e.is_connect() => {
                "Could not connect to the model endpoint".to_string()
            }
            QuizError::MissingConfigError { field } => {
                format!("Required setting `{}` is not set", field)
            }
            QuizError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting `{}` is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub(crate) fn not_found(&self) -> bool {
        matches!(self, QuizError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(feature = "mongo")]
impl From<mongodb::error::Error> for QuizError {
    fn from(e: mongodb::error::Error) -> Self {
        QuizError::StoreError {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuizError>;
