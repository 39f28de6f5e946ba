use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::commit::{CommitId, CommitRecord, CommitRewrite};
use crate::error::{AppError, AppResult};
use crate::services::VersionControlService;

const REFLOG_MESSAGE: &str = "historian: rewrite history";

pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    /// Fails when `repo_root` has no `.git` entry.
    pub fn open(repo_root: impl Into<PathBuf>) -> AppResult<Self> {
        let repo_root = repo_root.into();
        if !repo_root.join(".git").exists() {
            return Err(AppError::VersionControl(format!(
                "no Git repository found at {}",
                repo_root.display()
            )));
        }
        Ok(Self { repo_root })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    async fn output(&self, args: &[&str], envs: &[(&str, &str)]) -> AppResult<Output> {
        tracing::debug!(?args, "running git");
        Command::new("git")
            .args(args)
            .envs(envs.iter().copied())
            .current_dir(&self.repo_root)
            .output()
            .await
            .map_err(|err| AppError::VersionControl(format!("failed to run git: {err}")))
    }

    async fn run(&self, args: &[&str], envs: &[(&str, &str)]) -> AppResult<String> {
        let output = self.output(args, envs).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::VersionControl(format!(
                "`git {}` failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    async fn branch_exists(&self, branch: &str) -> AppResult<bool> {
        let reference = format!("refs/heads/{branch}");
        let output = self
            .output(&["rev-parse", "--verify", "--quiet", &reference], &[])
            .await?;
        Ok(output.status.success())
    }
}

#[async_trait]
impl VersionControlService for GitCli {
    async fn current_branch(&self) -> AppResult<String> {
        let output = self
            .output(&["symbolic-ref", "--quiet", "--short", "HEAD"], &[])
            .await?;
        if !output.status.success() {
            return Err(AppError::VersionControl(
                "HEAD is detached; set BRANCH or pass --branch".to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn ensure_clean(&self) -> AppResult<()> {
        let status = self
            .run(&["status", "--porcelain", "--untracked-files=no"], &[])
            .await?;
        if !status.is_empty() {
            return Err(AppError::VersionControl(
                "working tree has uncommitted changes; commit or stash them first".to_string(),
            ));
        }
        Ok(())
    }

    async fn list_commits(&self, branch: &str) -> AppResult<Vec<CommitRecord>> {
        if !self.branch_exists(branch).await? {
            // An unborn branch has no commits yet; anything else is a typo.
            if self.current_branch().await.ok().as_deref() == Some(branch) {
                return Ok(Vec::new());
            }
            return Err(AppError::VersionControl(format!("branch '{branch}' not found")));
        }

        let reference = format!("refs/heads/{branch}");
        let listing = self
            .run(
                &[
                    "log",
                    "--no-color",
                    "--no-show-signature",
                    "--reverse",
                    "--format=%H %T %P",
                    &reference,
                    "--",
                ],
                &[],
            )
            .await?;
        parse_commit_listing(&listing)
    }

    async fn recommit(
        &self,
        original: &CommitRecord,
        parent: Option<&CommitId>,
        rewrite: &CommitRewrite,
    ) -> AppResult<CommitId> {
        let mut args = vec!["commit-tree", "--no-gpg-sign"];
        if let Some(parent) = parent {
            args.extend(["-p", parent.as_str()]);
        }
        args.extend(["-m", rewrite.message.as_str(), original.tree.as_str()]);

        let date = rewrite.timestamp.to_git_date();
        let identity = &rewrite.identity;
        let envs = [
            ("GIT_AUTHOR_NAME", identity.name.as_str()),
            ("GIT_AUTHOR_EMAIL", identity.email.as_str()),
            ("GIT_AUTHOR_DATE", date.as_str()),
            ("GIT_COMMITTER_NAME", identity.name.as_str()),
            ("GIT_COMMITTER_EMAIL", identity.email.as_str()),
            ("GIT_COMMITTER_DATE", date.as_str()),
        ];

        let id = self.run(&args, &envs).await?;
        if id.is_empty() {
            return Err(AppError::VersionControl(format!(
                "git commit-tree returned no id for {}",
                original.id.short()
            )));
        }
        tracing::debug!(original = %original.id, rewritten = %id, "recommitted");
        Ok(CommitId(id))
    }

    async fn move_branch(
        &self,
        branch: &str,
        new_head: &CommitId,
        old_head: &CommitId,
    ) -> AppResult<()> {
        let reference = format!("refs/heads/{branch}");
        self.run(
            &[
                "update-ref",
                "-m",
                REFLOG_MESSAGE,
                &reference,
                new_head.as_str(),
                old_head.as_str(),
            ],
            &[],
        )
        .await?;
        Ok(())
    }

    async fn checkout(&self, branch: &str) -> AppResult<()> {
        self.run(&["checkout", "--quiet", branch], &[]).await?;
        Ok(())
    }
}

/// Parses `git log --format='%H %T %P'` output. Any line not led by a hex
/// object id is rejected rather than read as a commit.
fn parse_commit_listing(listing: &str) -> AppResult<Vec<CommitRecord>> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(id), Some(tree)) if is_object_id(id) => Ok(CommitRecord {
                    id: CommitId(id.to_string()),
                    tree: tree.to_string(),
                    parents: fields.map(|p| CommitId(p.to_string())).collect(),
                }),
                _ => Err(AppError::VersionControl(format!(
                    "unexpected git log line: {line}"
                ))),
            }
        })
        .collect()
}

fn is_object_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit())
}
