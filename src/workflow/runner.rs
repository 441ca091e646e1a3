use crate::adapters::storage::{walk_files, LocalStorage};
use crate::config::toml_config::WorkflowConfig;
use crate::core::etl::EtlEngine;
use crate::core::pipeline::NewsPipeline;
use crate::utils::error::{PagesError, Result};
use crate::workflow::lock::RunLock;
use crate::workflow::publish::GitPublisher;
use crate::workflow::step::{Step, StepKind};
use crate::workflow::trigger::TriggerKind;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::process::Command;

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    pub duration: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub trigger: TriggerKind,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Succeeded)
    }

    pub fn failed_step(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    pub fn duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

/// Runs the configured steps once, in order, stopping at the first failure.
pub struct WorkflowRunner {
    config: WorkflowConfig,
    steps: Vec<Step>,
    monitor: bool,
    working_dir: PathBuf,
}

impl WorkflowRunner {
    pub fn new(config: WorkflowConfig) -> Result<Self> {
        let steps = config.resolved_steps()?;
        Ok(Self {
            config,
            steps,
            monitor: false,
            working_dir: PathBuf::from("."),
        })
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled;
        self
    }

    /// Directory `run` steps start in and whose `origin` the publish step falls back to.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Takes the run lock, then runs. Manual dispatch must be enabled in `[trigger]`.
    pub async fn dispatch(&self, trigger: TriggerKind) -> Result<RunReport> {
        if trigger == TriggerKind::Manual && !self.config.trigger.manual {
            return Err(PagesError::config(
                "manual dispatch is disabled (trigger.manual = false)",
            ));
        }

        let _lock = RunLock::acquire(
            self.working_dir.join(&self.config.trigger.lock_file),
            self.config.trigger.stale_after(),
        )?;
        self.run(trigger).await
    }

    /// Like [`execute`](Self::execute), but a failed step becomes an error.
    pub async fn run(&self, trigger: TriggerKind) -> Result<RunReport> {
        let report = self.execute(trigger).await;
        match report.failed_step() {
            Some(failed) => Err(PagesError::StepFailed {
                step: failed.name.clone(),
                reason: failed.error.clone().unwrap_or_default(),
            }),
            None => Ok(report),
        }
    }

    pub async fn execute(&self, trigger: TriggerKind) -> RunReport {
        let started_at = Utc::now();
        tracing::info!(
            "▶️  Workflow '{}' triggered by {}",
            self.config.workflow.name,
            trigger
        );

        let mut reports = Vec::with_capacity(self.steps.len());
        let mut halted = false;

        for (index, step) in self.steps.iter().enumerate() {
            if halted {
                tracing::info!("⏭️  [{}/{}] {} skipped", index + 1, self.steps.len(), step.name);
                reports.push(StepReport {
                    name: step.name.clone(),
                    status: StepStatus::Skipped,
                    duration: Duration::ZERO,
                    error: None,
                });
                continue;
            }

            tracing::info!("🔧 [{}/{}] {}", index + 1, self.steps.len(), step.name);
            let started = Instant::now();
            let result = self.execute_step(step, &trigger).await;
            let duration = started.elapsed();

            match result {
                Ok(()) => {
                    tracing::info!("✅ {} ({:.1?})", step.name, duration);
                    reports.push(StepReport {
                        name: step.name.clone(),
                        status: StepStatus::Succeeded,
                        duration,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::error!("❌ {} failed: {}", step.name, e);
                    tracing::error!("💡 {}", e.recovery_suggestion());
                    halted = true;
                    reports.push(StepReport {
                        name: step.name.clone(),
                        status: StepStatus::Failed,
                        duration,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let report = RunReport {
            trigger,
            started_at,
            steps: reports,
        };
        if report.is_success() {
            tracing::info!("🎉 Workflow finished in {:.1?}", report.duration());
        } else {
            tracing::error!("Workflow failed after {:.1?}", report.duration());
        }
        report
    }

    async fn execute_step(&self, step: &Step, trigger: &TriggerKind) -> Result<()> {
        match &step.kind {
            StepKind::Run {
                command,
                env,
                working_directory,
                timeout,
            } => {
                self.run_command(command, env, working_directory.as_deref(), *timeout, trigger)
                    .await
            }
            StepKind::Build => self.build().await,
            StepKind::Inspect => self.inspect().await,
            StepKind::Publish => self.publish().await,
        }
    }

    fn site_dir(&self) -> PathBuf {
        self.working_dir.join(&self.config.site.output_path)
    }

    async fn build(&self) -> Result<()> {
        let mut config = self.config.clone();
        config.site.output_path = self.site_dir().display().to_string();

        let storage = LocalStorage::new(config.site.output_path.clone());
        let pipeline = NewsPipeline::new(storage, config)?;
        let engine = EtlEngine::new_with_monitoring(pipeline, self.monitor);

        let output_path = engine.run().await?;
        tracing::info!("📁 Output saved to: {}", output_path);
        Ok(())
    }

    async fn inspect(&self) -> Result<()> {
        let site_dir = self.site_dir();
        let files = walk_files(&site_dir).await.map_err(|e| PagesError::ProcessingError {
            message: format!("cannot list '{}': {}", site_dir.display(), e),
        })?;

        let total: u64 = files.iter().map(|f| f.size).sum();
        tracing::info!("{} ({} files, {} bytes)", site_dir.display(), files.len(), total);
        for file in &files {
            tracing::info!("  {} ({} bytes)", file.path, file.size);
        }
        Ok(())
    }

    async fn publish(&self) -> Result<()> {
        let publisher = GitPublisher::from_config(&self.config.publish, self.site_dir())
            .with_working_dir(&self.working_dir);
        let outcome = publisher.publish().await?;

        if outcome.pushed {
            tracing::info!(
                "🚀 '{}' now at {} (tree {})",
                outcome.branch,
                outcome.commit,
                outcome.tree
            );
        } else {
            tracing::info!("'{}' unchanged (tree {})", outcome.branch, outcome.tree);
        }
        Ok(())
    }

    async fn run_command(
        &self,
        command: &str,
        env: &BTreeMap<String, String>,
        working_directory: Option<&str>,
        timeout: Option<Duration>,
        trigger: &TriggerKind,
    ) -> Result<()> {
        let cwd = match working_directory {
            Some(dir) => self.working_dir.join(dir),
            None => self.working_dir.clone(),
        };
        tracing::debug!("$ {}", command);

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .envs(env)
            .env("NEWS_PAGES_EVENT", trigger.event_name())
            .current_dir(&cwd)
            .kill_on_drop(true)
            .output();

        let first_line = command.lines().next().unwrap_or("").to_string();
        let output = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child).await {
                Ok(output) => output,
                Err(_) => {
                    return Err(PagesError::CommandError {
                        command: first_line,
                        exit_code: None,
                        stderr: format!("timed out after {:?}", limit),
                    })
                }
            },
            None => child.await,
        }
        .map_err(|e| PagesError::CommandError {
            command: first_line.clone(),
            exit_code: None,
            stderr: format!("could not start shell: {}", e),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            tracing::info!("  | {}", line);
        }
        for line in stderr.lines() {
            tracing::info!("  ! {}", line);
        }

        if !output.status.success() {
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(PagesError::CommandError {
                command: first_line,
                exit_code: output.status.code(),
                stderr: tail,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::StepConfig;
    use tempfile::TempDir;

    fn run_step(name: &str, command: &str) -> StepConfig {
        StepConfig {
            name: Some(name.to_string()),
            run: Some(command.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_step_skips_the_rest() {
        let dir = TempDir::new().unwrap();
        let mut config = WorkflowConfig::default();
        config.steps = vec![
            run_step("Install dependencies", "echo installing; exit 3"),
            StepConfig {
                uses: Some("publish".to_string()),
                ..Default::default()
            },
        ];

        let runner = WorkflowRunner::new(config).unwrap().with_working_dir(dir.path());
        let report = runner.execute(TriggerKind::Manual).await;

        assert!(!report.is_success());
        assert_eq!(report.steps[0].status, StepStatus::Failed);
        assert!(report.steps[0].error.as_deref().unwrap().contains("exit code 3"));
        assert_eq!(report.steps[1].status, StepStatus::Skipped);
        assert_eq!(report.failed_step().unwrap().name, "Install dependencies");
    }

    #[tokio::test]
    async fn test_run_maps_failure_to_error() {
        let dir = TempDir::new().unwrap();
        let mut config = WorkflowConfig::default();
        config.steps = vec![run_step("Fail", "echo broken >&2; false")];

        let runner = WorkflowRunner::new(config).unwrap().with_working_dir(dir.path());
        match runner.run(TriggerKind::Manual).await {
            Err(PagesError::StepFailed { step, reason }) => {
                assert_eq!(step, "Fail");
                assert!(reason.contains("broken"));
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.steps.len())),
        }
    }

    #[tokio::test]
    async fn test_run_steps_see_env_and_event() {
        let dir = TempDir::new().unwrap();
        let mut step = run_step("Write env", "printf '%s %s' \"$NEWS_PAGES_EVENT\" \"$GREETING\" > out.txt");
        step.env.insert("GREETING".to_string(), "hello".to_string());

        let mut config = WorkflowConfig::default();
        config.steps = vec![step];

        let runner = WorkflowRunner::new(config).unwrap().with_working_dir(dir.path());
        let report = runner.run(TriggerKind::Manual).await.unwrap();

        assert!(report.is_success());
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "workflow_dispatch hello");
    }

    #[tokio::test]
    async fn test_step_timeout() {
        let dir = TempDir::new().unwrap();
        let mut config = WorkflowConfig::default();
        config.steps = vec![run_step("Slow", "sleep 5")];

        let mut runner = WorkflowRunner::new(config).unwrap().with_working_dir(dir.path());
        if let StepKind::Run { timeout, .. } = &mut runner.steps[0].kind {
            *timeout = Some(Duration::from_millis(100));
        }

        let report = runner.execute(TriggerKind::Manual).await;
        assert_eq!(report.steps[0].status, StepStatus::Failed);
        assert!(report.steps[0].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_inspect_fails_without_site() {
        let dir = TempDir::new().unwrap();
        let mut config = WorkflowConfig::default();
        config.steps = vec![StepConfig {
            uses: Some("inspect".to_string()),
            ..Default::default()
        }];

        let runner = WorkflowRunner::new(config).unwrap().with_working_dir(dir.path());
        let report = runner.execute(TriggerKind::Manual).await;
        assert_eq!(report.steps[0].status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn test_manual_dispatch_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = WorkflowConfig::default();
        config.trigger.manual = false;
        config.steps = vec![run_step("Noop", "true")];

        let runner = WorkflowRunner::new(config).unwrap().with_working_dir(dir.path());
        assert!(matches!(
            runner.dispatch(TriggerKind::Manual).await,
            Err(PagesError::ConfigError { .. })
        ));

        let scheduled = TriggerKind::Schedule {
            scheduled_for: Utc::now(),
        };
        assert!(runner.dispatch(scheduled).await.is_ok());
    }

    #[tokio::test]
    async fn test_huge_stale_lock_setting_does_not_overflow() {
        let dir = TempDir::new().unwrap();
        let mut config = WorkflowConfig::default();
        config.trigger.stale_lock_minutes = u64::MAX / 2;
        config.steps = vec![run_step("Noop", "true")];

        let runner = WorkflowRunner::new(config).unwrap().with_working_dir(dir.path());
        assert!(runner.dispatch(TriggerKind::Manual).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_refuses_concurrent_run() {
        let dir = TempDir::new().unwrap();
        let mut config = WorkflowConfig::default();
        config.steps = vec![run_step("Noop", "true")];

        let runner = WorkflowRunner::new(config).unwrap().with_working_dir(dir.path());
        let _held = RunLock::acquire(
            dir.path().join(".news-pages.lock"),
            Duration::from_secs(3600),
        )
        .unwrap();

        assert!(matches!(
            runner.dispatch(TriggerKind::Manual).await,
            Err(PagesError::RunInProgress { .. })
        ));
    }
}
