use crate::adapters::storage::{copy_tree, walk_files};
use crate::config::toml_config::PublishConfig;
use crate::utils::error::{PagesError, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub branch: String,
    pub commit: String,
    pub tree: String,
    pub files: usize,
    /// False when the remote branch already had an identical tree.
    pub pushed: bool,
}

/// Replaces the whole tree of a branch with the contents of a directory.
///
/// Every publish is a single orphan commit force-pushed to the branch, so the
/// branch never accumulates history and its tree is exactly the directory.
pub struct GitPublisher {
    source_dir: PathBuf,
    working_dir: PathBuf,
    branch: String,
    repository: Option<String>,
    token: Option<String>,
    commit_message: String,
    user_name: String,
    user_email: String,
    nojekyll: bool,
    skip_unchanged: bool,
}

impl GitPublisher {
    pub fn from_config(config: &PublishConfig, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            working_dir: PathBuf::from("."),
            branch: config.branch.clone(),
            repository: config.repository.clone(),
            token: config.resolved_token(),
            commit_message: config.commit_message.clone(),
            user_name: config.user_name.clone(),
            user_email: config.user_email.clone(),
            nojekyll: config.nojekyll,
            skip_unchanged: config.skip_unchanged,
        }
    }

    /// Directory whose `origin` remote is used when no repository is configured.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub async fn publish(&self) -> Result<PublishOutcome> {
        let files = match walk_files(&self.source_dir).await {
            Ok(files) => files,
            Err(PagesError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PagesError::publish(format!(
                    "publish directory '{}' does not exist",
                    self.source_dir.display()
                )))
            }
            Err(e) => return Err(e),
        };
        if files.is_empty() {
            return Err(PagesError::publish(format!(
                "publish directory '{}' is empty",
                self.source_dir.display()
            )));
        }

        let remote = self.resolve_remote().await?;

        let worktree = tempfile::TempDir::new()?;
        let dir = worktree.path();
        let head_ref = format!("refs/heads/{}", self.branch);

        self.git(dir, &["init", "--quiet"]).await?;
        self.git(dir, &["symbolic-ref", "HEAD", &head_ref]).await?;

        let mut copied = copy_tree(&self.source_dir, dir).await?;
        let nojekyll = dir.join(".nojekyll");
        if self.nojekyll && !nojekyll.exists() {
            tokio::fs::write(&nojekyll, b"").await?;
            copied += 1;
        }

        self.git(dir, &["add", "--all"]).await?;
        let name = format!("user.name={}", self.user_name);
        let email = format!("user.email={}", self.user_email);
        self.git(
            dir,
            &[
                "-c",
                &name,
                "-c",
                &email,
                "-c",
                "commit.gpgsign=false",
                "commit",
                "--quiet",
                "-m",
                &self.commit_message,
            ],
        )
        .await?;

        let tree = self.git(dir, &["rev-parse", "HEAD^{tree}"]).await?;
        let commit = self.git(dir, &["rev-parse", "HEAD"]).await?;

        if self.skip_unchanged {
            if let Some(remote_tree) = self.remote_tree(dir, &remote, &head_ref).await {
                if remote_tree == tree {
                    tracing::info!(
                        "Branch '{}' already has tree {}, skipping push",
                        self.branch,
                        tree
                    );
                    return Ok(PublishOutcome {
                        branch: self.branch.clone(),
                        commit,
                        tree,
                        files: copied,
                        pushed: false,
                    });
                }
            }
        }

        let refspec = format!("HEAD:{}", head_ref);
        self.git(dir, &["push", "--quiet", "--force", &remote, &refspec])
            .await?;
        tracing::info!(
            "Published {} files to '{}' (commit {})",
            copied,
            self.branch,
            commit
        );

        Ok(PublishOutcome {
            branch: self.branch.clone(),
            commit,
            tree,
            files: copied,
            pushed: true,
        })
    }

    async fn resolve_remote(&self) -> Result<String> {
        let remote = match &self.repository {
            Some(repository) => repository.clone(),
            None => self
                .git(&self.working_dir, &["remote", "get-url", "origin"])
                .await
                .map_err(|e| {
                    PagesError::publish(format!(
                        "no publish.repository configured and no origin remote found: {}",
                        e
                    ))
                })?,
        };
        Ok(self.authenticated_url(&remote))
    }

    /// Embeds the token into `https://` remotes that carry no credentials yet.
    fn authenticated_url(&self, remote: &str) -> String {
        let Some(token) = &self.token else {
            return remote.to_string();
        };
        match Url::parse(remote) {
            Ok(mut url) if url.scheme() == "https" && url.username().is_empty() => {
                if url.set_username("x-access-token").is_ok() && url.set_password(Some(token.as_str())).is_ok() {
                    url.to_string()
                } else {
                    remote.to_string()
                }
            }
            _ => remote.to_string(),
        }
    }

    async fn remote_tree(&self, dir: &Path, remote: &str, head_ref: &str) -> Option<String> {
        if let Err(e) = self.git(dir, &["fetch", "--quiet", remote, head_ref]).await {
            tracing::debug!("Remote branch not fetched, treating as changed: {}", e);
            return None;
        }
        self.git(dir, &["rev-parse", "FETCH_HEAD^{tree}"]).await.ok()
    }

    fn scrub(&self, text: &str) -> String {
        match &self.token {
            Some(token) if !token.is_empty() => text.replace(token.as_str(), "***"),
            _ => text.to_string(),
        }
    }

    /// Runs git in `dir` and returns trimmed stdout.
    async fn git(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let label = subcommand(args);

        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PagesError::CommandError {
                command: format!("git {}", label),
                exit_code: None,
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(PagesError::CommandError {
                command: format!("git {}", label),
                exit_code: output.status.code(),
                stderr: self.scrub(String::from_utf8_lossy(&output.stderr).trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// First argument that is not a `-c key=value` override.
fn subcommand<'a>(args: &[&'a str]) -> &'a str {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "-c" {
            iter.next();
            continue;
        }
        return arg;
    }
    "git"
}
