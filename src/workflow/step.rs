use crate::config::toml_config::StepConfig;
use crate::utils::error::{PagesError, Result};
use crate::utils::validation;
use std::collections::BTreeMap;
use std::time::Duration;

/// Upper bound for minute-valued settings: one week.
pub const MAX_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Shell command run through `sh -c`.
    Run {
        command: String,
        env: BTreeMap<String, String>,
        working_directory: Option<String>,
        timeout: Option<Duration>,
    },
    Build,
    Inspect,
    Publish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub kind: StepKind,
}

impl Step {
    pub fn build() -> Self {
        Self {
            name: "Build site".to_string(),
            kind: StepKind::Build,
        }
    }

    pub fn inspect() -> Self {
        Self {
            name: "Inspect site".to_string(),
            kind: StepKind::Inspect,
        }
    }

    pub fn publish() -> Self {
        Self {
            name: "Publish site".to_string(),
            kind: StepKind::Publish,
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::build(), Self::inspect(), Self::publish()]
    }

    pub fn from_config(index: usize, config: &StepConfig) -> Result<Self> {
        let field = format!("steps[{}]", index);

        let kind = match (&config.run, &config.uses) {
            (Some(_), Some(_)) => {
                return Err(PagesError::ConfigValidationError {
                    field,
                    message: "a step sets either `run` or `uses`, not both".to_string(),
                })
            }
            (None, None) => {
                return Err(PagesError::ConfigValidationError {
                    field,
                    message: "a step needs `run` or `uses`".to_string(),
                })
            }
            (Some(command), None) => {
                if command.trim().is_empty() {
                    return Err(PagesError::ConfigValidationError {
                        field,
                        message: "`run` cannot be empty".to_string(),
                    });
                }
                if let Some(minutes) = config.timeout_minutes {
                    validation::validate_range(
                        &format!("{}.timeout_minutes", field),
                        minutes,
                        1,
                        MAX_MINUTES,
                    )?;
                }
                StepKind::Run {
                    command: command.clone(),
                    env: config.env.clone(),
                    working_directory: config.working_directory.clone(),
                    timeout: config.timeout_minutes.map(|m| Duration::from_secs(m * 60)),
                }
            }
            (None, Some(uses)) => match uses.as_str() {
                "build" => StepKind::Build,
                "inspect" => StepKind::Inspect,
                "publish" => StepKind::Publish,
                other => {
                    return Err(PagesError::InvalidConfigValueError {
                        field: format!("{}.uses", field),
                        value: other.to_string(),
                        reason: "Allowed values: build, inspect, publish".to_string(),
                    })
                }
            },
        };

        if config.run.is_none() && (!config.env.is_empty() || config.working_directory.is_some()) {
            tracing::warn!("{}: `env` and `working_directory` only apply to `run` steps", field);
        }

        let name = config.name.clone().unwrap_or_else(|| match &kind {
            StepKind::Run { command, .. } => format!("Run {}", command.lines().next().unwrap_or("")),
            StepKind::Build => Step::build().name,
            StepKind::Inspect => Step::inspect().name,
            StepKind::Publish => Step::publish().name,
        });

        Ok(Self { name, kind })
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            StepKind::Run { .. } => "run",
            StepKind::Build => "build",
            StepKind::Inspect => "inspect",
            StepKind::Publish => "publish",
        }
    }
}
