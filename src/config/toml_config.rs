use crate::core::filter::{KeywordFilter, DEFAULT_KEYWORDS};
use crate::core::render::{
    DEFAULT_EMPTY_MESSAGE, DEFAULT_HEADING, DEFAULT_STYLESHEET, DEFAULT_TITLE,
};
use crate::domain::ports::{ConfigProvider, FetchFailurePolicy};
use crate::utils::error::{PagesError, Result};
use crate::utils::validation::{self, Validate};
use crate::workflow::schedule::CronSchedule;
use crate::workflow::step::{Step, MAX_MINUTES};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "news-pages.toml";

pub const DEFAULT_ENDPOINT: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_QUERY: &str =
    r#"("Artificial Intelligence" OR "machine learning" OR "deep learning" OR "neural network" OR "AI")"#;
pub const DEFAULT_SCHEDULE: &str = "*/5 * * * *";

const SORT_OPTIONS: &[&str] = &["publishedAt", "relevancy", "popularity"];
const FETCH_FAILURE_OPTIONS: &[&str] = &["empty", "fail"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub workflow: WorkflowSection,
    pub trigger: TriggerConfig,
    pub source: SourceConfig,
    pub filter: FilterConfig,
    pub site: SiteConfig,
    pub publish: PublishConfig,
    pub error_handling: ErrorHandlingConfig,
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSection {
    pub name: String,
    pub description: String,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            name: "news-pages".to_string(),
            description: "Build the AI news page and publish it".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Five-field cron expression in UTC. Empty disables the schedule.
    pub schedule: String,
    pub manual: bool,
    pub lock_file: String,
    pub stale_lock_minutes: u64,
}

impl TriggerConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_lock_minutes.saturating_mul(60))
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            schedule: DEFAULT_SCHEDULE.to_string(),
            manual: true,
            lock_file: ".news-pages.lock".to_string(),
            stale_lock_minutes: 60,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub query: String,
    pub sort_by: String,
    pub page_size: u32,
    pub language: String,
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            api_key_env: "NEWS_API_KEY".to_string(),
            query: DEFAULT_QUERY.to_string(),
            sort_by: "publishedAt".to_string(),
            page_size: 20,
            language: "en".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_key_env", &self.api_key_env)
            .field("query", &self.query)
            .field("sort_by", &self.sort_by)
            .field("page_size", &self.page_size)
            .field("language", &self.language)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub output_path: String,
    pub title: String,
    pub heading: String,
    pub empty_message: String,
    pub stylesheet: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            output_path: "site".to_string(),
            title: DEFAULT_TITLE.to_string(),
            heading: DEFAULT_HEADING.to_string(),
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub branch: String,
    /// Push target. Falls back to the `origin` remote of the working directory.
    pub repository: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub token_env: String,
    pub commit_message: String,
    pub user_name: String,
    pub user_email: String,
    pub nojekyll: bool,
    pub skip_unchanged: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            branch: "gh-pages".to_string(),
            repository: None,
            token: None,
            token_env: "GITHUB_TOKEN".to_string(),
            commit_message: "Deploy news site".to_string(),
            user_name: "github-actions[bot]".to_string(),
            user_email: "41898282+github-actions[bot]@users.noreply.github.com".to_string(),
            nojekyll: true,
            skip_unchanged: true,
        }
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("branch", &self.branch)
            .field("repository", &self.repository)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("token_env", &self.token_env)
            .field("commit_message", &self.commit_message)
            .field("user_name", &self.user_name)
            .field("user_email", &self.user_email)
            .field("nojekyll", &self.nojekyll)
            .field("skip_unchanged", &self.skip_unchanged)
            .finish()
    }
}

impl PublishConfig {
    pub fn resolved_token(&self) -> Option<String> {
        resolve_secret(self.token.as_deref(), &self.token_env)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlingConfig {
    /// `empty` renders the "no articles" page, `fail` halts the run.
    pub on_fetch_failure: String,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            on_fetch_failure: "empty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub name: Option<String>,
    pub run: Option<String>,
    pub uses: Option<String>,
    pub env: BTreeMap<String, String>,
    pub working_directory: Option<String>,
    pub timeout_minutes: Option<u64>,
}

fn is_unresolved_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("${") && value.ends_with('}')
}

/// Configured value unless empty or an unsubstituted `${VAR}`, then the named env var.
fn resolve_secret(configured: Option<&str>, env_name: &str) -> Option<String> {
    configured
        .filter(|v| !v.trim().is_empty() && !is_unresolved_placeholder(v))
        .map(str::to_string)
        .or_else(|| std::env::var(env_name).ok())
        .filter(|v| !v.trim().is_empty())
}

impl WorkflowConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PagesError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PagesError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// An explicit path must exist. Without one, `news-pages.toml` is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                tracing::debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    /// Replaces `${VAR}` with the environment value. Unset variables are left verbatim.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn schedule(&self) -> Result<Option<CronSchedule>> {
        let expression = self.trigger.schedule.trim();
        if expression.is_empty() {
            return Ok(None);
        }
        CronSchedule::parse(expression).map(Some)
    }

    /// Configured steps, or build → inspect → publish when none are listed.
    pub fn resolved_steps(&self) -> Result<Vec<Step>> {
        if self.steps.is_empty() {
            return Ok(Step::defaults());
        }
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| Step::from_config(index, step))
            .collect()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        validation::validate_non_empty_string("source.query", &self.source.query)?;
        validation::validate_one_of("source.sort_by", &self.source.sort_by, SORT_OPTIONS)?;
        validation::validate_range("source.page_size", self.source.page_size, 1, 100)?;
        validation::validate_non_empty_string("source.language", &self.source.language)?;
        validation::validate_range("source.timeout_seconds", self.source.timeout_seconds, 1, 600)?;

        KeywordFilter::new(&self.filter.keywords)?;

        validation::validate_path("site.output_path", &self.site.output_path)?;
        let trimmed = self.site.output_path.trim_end_matches('/');
        if matches!(trimmed, "" | "." | "..") {
            return Err(PagesError::InvalidConfigValueError {
                field: "site.output_path".to_string(),
                value: self.site.output_path.clone(),
                reason: "The output directory is wiped on every build and cannot be the working directory or root".to_string(),
            });
        }

        validation::validate_branch_name("publish.branch", &self.publish.branch)?;
        if let Some(repository) = &self.publish.repository {
            validation::validate_non_empty_string("publish.repository", repository)?;
        }
        validation::validate_non_empty_string("publish.commit_message", &self.publish.commit_message)?;

        validation::validate_one_of(
            "error_handling.on_fetch_failure",
            &self.error_handling.on_fetch_failure,
            FETCH_FAILURE_OPTIONS,
        )?;

        self.schedule()?;
        validation::validate_path("trigger.lock_file", &self.trigger.lock_file)?;
        validation::validate_range(
            "trigger.stale_lock_minutes",
            self.trigger.stale_lock_minutes,
            1,
            MAX_MINUTES,
        )?;

        self.resolved_steps()?;
        Ok(())
    }
}

impl ConfigProvider for WorkflowConfig {
    fn api_endpoint(&self) -> &str {
        &self.source.endpoint
    }

    fn api_key(&self) -> Option<String> {
        resolve_secret(self.source.api_key.as_deref(), &self.source.api_key_env)
    }

    fn query(&self) -> &str {
        &self.source.query
    }

    fn sort_by(&self) -> &str {
        &self.source.sort_by
    }

    fn page_size(&self) -> u32 {
        self.source.page_size
    }

    fn language(&self) -> &str {
        &self.source.language
    }

    fn timeout_seconds(&self) -> u64 {
        self.source.timeout_seconds
    }

    fn keywords(&self) -> &[String] {
        &self.filter.keywords
    }

    fn output_path(&self) -> &str {
        &self.site.output_path
    }

    fn site_title(&self) -> &str {
        &self.site.title
    }

    fn site_heading(&self) -> &str {
        &self.site.heading
    }

    fn empty_message(&self) -> &str {
        &self.site.empty_message
    }

    fn stylesheet(&self) -> &str {
        &self.site.stylesheet
    }

    fn fetch_failure_policy(&self) -> FetchFailurePolicy {
        match self.error_handling.on_fetch_failure.as_str() {
            "fail" => FetchFailurePolicy::Fail,
            _ => FetchFailurePolicy::Empty,
        }
    }
}

impl Validate for WorkflowConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
