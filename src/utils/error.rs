use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagesError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("NewsAPI returned an error ({code}): {message}")]
    NewsApiError { code: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid keyword pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid schedule '{expression}': {reason}")]
    ScheduleError { expression: String, reason: String },

    #[error("Command '{command}' failed{}: {stderr}", .exit_code.map(|c| format!(" with exit code {}", c)).unwrap_or_default())]
    CommandError {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Publish failed: {message}")]
    PublishError { message: String },

    #[error("Another run is in progress (lock held at {lock_path})")]
    RunInProgress { lock_path: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, PagesError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Processing,
    Storage,
    Workflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code used by the CLI for this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl PagesError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn publish(message: impl Into<String>) -> Self {
        Self::PublishError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PagesError::HttpError(_) | PagesError::NewsApiError { .. } => ErrorCategory::Network,
            PagesError::ConfigError { .. }
            | PagesError::ConfigValidationError { .. }
            | PagesError::MissingConfigError { .. }
            | PagesError::InvalidConfigValueError { .. }
            | PagesError::ScheduleError { .. }
            | PagesError::PatternError(_) => ErrorCategory::Configuration,
            PagesError::IoError(_) => ErrorCategory::Storage,
            PagesError::SerializationError(_) | PagesError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
            PagesError::CommandError { .. }
            | PagesError::StepFailed { .. }
            | PagesError::PublishError { .. }
            | PagesError::RunInProgress { .. } => ErrorCategory::Workflow,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PagesError::HttpError(_)
            | PagesError::NewsApiError { .. }
            | PagesError::RunInProgress { .. } => ErrorSeverity::Medium,
            PagesError::SerializationError(_)
            | PagesError::ProcessingError { .. }
            | PagesError::CommandError { .. }
            | PagesError::StepFailed { .. }
            | PagesError::PublishError { .. } => ErrorSeverity::High,
            PagesError::IoError(_)
            | PagesError::PatternError(_)
            | PagesError::ConfigError { .. }
            | PagesError::ConfigValidationError { .. }
            | PagesError::MissingConfigError { .. }
            | PagesError::InvalidConfigValueError { .. }
            | PagesError::ScheduleError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PagesError::HttpError(_) => "Check network connectivity and the source endpoint, then retry",
            PagesError::NewsApiError { .. } => {
                "Check that NEWS_API_KEY is valid and that the plan allows this query"
            }
            PagesError::IoError(_) => "Check that the output directory is writable",
            PagesError::SerializationError(_) => "The API response was not in the expected format",
            PagesError::PatternError(_) => "Review the [filter] keywords",
            PagesError::ConfigError { .. }
            | PagesError::ConfigValidationError { .. }
            | PagesError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and run `news-pages validate`"
            }
            PagesError::MissingConfigError { .. } => "Add the missing field to the configuration file",
            PagesError::ScheduleError { .. } => {
                "Use a 5-field cron expression such as \"*/5 * * * *\""
            }
            PagesError::CommandError { .. } | PagesError::StepFailed { .. } => {
                "Inspect the step output above; later steps were skipped"
            }
            PagesError::PublishError { .. } => {
                "Check GITHUB_TOKEN permissions and that the publish directory is populated"
            }
            PagesError::RunInProgress { .. } => {
                "Wait for the current run to finish, or remove a stale lock file"
            }
            PagesError::ProcessingError { .. } => "Re-run with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not fetch news: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Processing => format!("Could not build the site: {}", self),
            ErrorCategory::Storage => format!("Could not write the site: {}", self),
            ErrorCategory::Workflow => format!("Workflow run failed: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display() {
        let err = PagesError::CommandError {
            command: "pip install".to_string(),
            exit_code: Some(2),
            stderr: "no such file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command 'pip install' failed with exit code 2: no such file"
        );

        let killed = PagesError::CommandError {
            command: "sleep".to_string(),
            exit_code: None,
            stderr: "timed out".to_string(),
        };
        assert_eq!(killed.to_string(), "Command 'sleep' failed: timed out");
    }

    #[test]
    fn test_severity_exit_codes() {
        assert_eq!(PagesError::config("bad").severity().exit_code(), 3);
        let step = PagesError::StepFailed {
            step: "Build".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(step.severity().exit_code(), 1);
        assert_eq!(step.category(), ErrorCategory::Workflow);
        let busy = PagesError::RunInProgress {
            lock_path: ".news-pages.lock".to_string(),
        };
        assert_eq!(busy.severity().exit_code(), 2);
    }
}
