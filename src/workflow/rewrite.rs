use rand::Rng;

use crate::context::AppContext;
use crate::domain::commit::{CommitId, CommitRecord, CommitRewrite};
use crate::domain::message::CommitMessage;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    pub branch: Option<String>,
    pub dry_run: bool,
}

pub struct RewriteProgress<'a> {
    /// 1-based position of the commit in the branch history.
    pub index: usize,
    pub total: usize,
    pub original: &'a CommitRecord,
    pub rewrite: &'a CommitRewrite,
}

#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub branch: String,
    pub rewritten: usize,
    pub new_head: Option<CommitId>,
    pub dry_run: bool,
}

/// Replaces message, identity and dates of every commit on a linear branch,
/// oldest first, keeping each commit's tree. The branch is moved to the new
/// head and checked out once every commit has been written.
pub async fn rewrite_history<R, F>(
    ctx: &AppContext,
    options: RewriteOptions,
    rng: &mut R,
    mut on_commit: F,
) -> AppResult<RewriteOutcome>
where
    R: Rng + ?Sized,
    F: FnMut(&RewriteProgress<'_>),
{
    let vcs = &ctx.version_control;
    let branch = match options.branch.or_else(|| ctx.config.branch.clone()) {
        Some(branch) => branch,
        None => vcs.current_branch().await?,
    };

    if !options.dry_run {
        vcs.ensure_clean().await?;
    }

    let commits = vcs.list_commits(&branch).await?;
    let mut outcome = RewriteOutcome {
        branch,
        rewritten: 0,
        new_head: None,
        dry_run: options.dry_run,
    };
    if commits.is_empty() {
        tracing::warn!(branch = %outcome.branch, "no commits found to rewrite");
        return Ok(outcome);
    }

    if let Some(merge) = commits.iter().find(|commit| commit.is_merge()) {
        return Err(AppError::VersionControl(format!(
            "commit {} is a merge; only linear history can be rewritten",
            merge.id.short()
        )));
    }

    let total = commits.len();
    let mut parent: Option<CommitId> = None;
    for (position, original) in commits.iter().enumerate() {
        let rewrite = CommitRewrite {
            message: generate_message(ctx).await?,
            timestamp: ctx.config.date_window.sample(rng),
            identity: ctx.config.identity.clone(),
        };

        on_commit(&RewriteProgress {
            index: position + 1,
            total,
            original,
            rewrite: &rewrite,
        });

        if !options.dry_run {
            let id = vcs.recommit(original, parent.as_ref(), &rewrite).await?;
            parent = Some(id);
        }
        outcome.rewritten += 1;
    }

    if let (Some(new_head), Some(old_head)) = (parent, commits.last()) {
        vcs.move_branch(&outcome.branch, &new_head, &old_head.id).await?;
        vcs.checkout(&outcome.branch).await?;
        tracing::info!(
            branch = %outcome.branch,
            head = %new_head.short(),
            "branch moved to rewritten history"
        );
        outcome.new_head = Some(new_head);
    }

    Ok(outcome)
}

async fn generate_message(ctx: &AppContext) -> AppResult<CommitMessage> {
    let attempts = ctx.config.generation_attempts;
    for attempt in 1..=attempts {
        let raw = ctx.language_model.generate_commit_message().await?;
        if let Some(message) = CommitMessage::from_generated(&raw) {
            tracing::debug!(%message, attempt, "generated commit message");
            return Ok(message);
        }
        tracing::warn!(
            attempt,
            raw = %raw,
            "language model returned an unusable commit message"
        );
    }
    Err(AppError::LanguageModel(format!(
        "no usable commit message after {attempts} attempt(s)"
    )))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::process::Command;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    use super::*;
    use crate::config::AppConfig;
    use crate::domain::identity::AuthorIdentity;
    use crate::domain::timestamp::DateWindow;
    use crate::infra::git::GitCli;
    use crate::services::{LanguageModelService, VersionControlService};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Recommit {
            original: String,
            parent: Option<String>,
            message: String,
        },
        MoveBranch {
            branch: String,
            new_head: String,
            old_head: String,
        },
        Checkout(String),
    }

    struct FakeGit {
        current: String,
        commits: Vec<CommitRecord>,
        dirty: bool,
        calls: Mutex<Vec<Call>>,
        listed: Mutex<Vec<String>>,
    }

    impl FakeGit {
        fn linear(ids: &[&str]) -> Self {
            let commits = ids
                .iter()
                .enumerate()
                .map(|(i, id)| CommitRecord {
                    id: CommitId(id.to_string()),
                    tree: format!("tree-{id}"),
                    parents: if i == 0 {
                        Vec::new()
                    } else {
                        vec![CommitId(ids[i - 1].to_string())]
                    },
                })
                .collect();
            Self {
                current: "master".to_string(),
                commits,
                dirty: false,
                calls: Mutex::new(Vec::new()),
                listed: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VersionControlService for FakeGit {
        async fn current_branch(&self) -> AppResult<String> {
            Ok(self.current.clone())
        }

        async fn ensure_clean(&self) -> AppResult<()> {
            if self.dirty {
                return Err(AppError::VersionControl("dirty".to_string()));
            }
            Ok(())
        }

        async fn list_commits(&self, branch: &str) -> AppResult<Vec<CommitRecord>> {
            self.listed.lock().unwrap().push(branch.to_string());
            Ok(self.commits.clone())
        }

        async fn recommit(
            &self,
            original: &CommitRecord,
            parent: Option<&CommitId>,
            rewrite: &CommitRewrite,
        ) -> AppResult<CommitId> {
            self.calls.lock().unwrap().push(Call::Recommit {
                original: original.id.to_string(),
                parent: parent.map(|p| p.to_string()),
                message: rewrite.message.to_string(),
            });
            Ok(CommitId(format!("new-{}", original.id)))
        }

        async fn move_branch(
            &self,
            branch: &str,
            new_head: &CommitId,
            old_head: &CommitId,
        ) -> AppResult<()> {
            self.calls.lock().unwrap().push(Call::MoveBranch {
                branch: branch.to_string(),
                new_head: new_head.to_string(),
                old_head: old_head.to_string(),
            });
            Ok(())
        }

        async fn checkout(&self, branch: &str) -> AppResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Checkout(branch.to_string()));
            Ok(())
        }
    }

    struct ScriptedModel {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedModel {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl LanguageModelService for ScriptedModel {
        async fn generate_commit_message(&self) -> AppResult<String> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AppError::LanguageModel("script exhausted".to_string()))
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            repo_path: PathBuf::from("/tmp/repo"),
            identity: AuthorIdentity::new("Ada Lovelace", "ada@example.com").unwrap(),
            ollama_model: "mistral".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            date_window: DateWindow::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )
            .unwrap(),
            branch: None,
            generation_attempts: 3,
        }
    }

    fn context(config: AppConfig, git: Arc<FakeGit>, model: ScriptedModel) -> AppContext {
        AppContext::new(config, git, Arc::new(model))
    }

    #[tokio::test]
    async fn rewrites_every_commit_in_order() {
        let git = Arc::new(FakeGit::linear(&["a", "b", "c"]));
        let ctx = context(
            config(),
            git.clone(),
            ScriptedModel::new(&["Add parser", "Sure! Fix lexer", "Bump version"]),
        );

        let mut seen = Vec::new();
        let outcome = rewrite_history(
            &ctx,
            RewriteOptions::default(),
            &mut StdRng::seed_from_u64(1),
            |progress| {
                assert_eq!(progress.total, 3);
                assert_eq!(progress.rewrite.identity.email, "ada@example.com");
                let day = progress.rewrite.timestamp.0.date();
                assert!(day >= ctx.config.date_window.start());
                assert!(day <= ctx.config.date_window.end());
                seen.push((progress.index, progress.original.id.to_string()));
            },
        )
        .await
        .unwrap();

        assert_eq!(
            seen,
            vec![
                (1, "a".to_string()),
                (2, "b".to_string()),
                (3, "c".to_string())
            ]
        );
        assert_eq!(outcome.rewritten, 3);
        assert_eq!(outcome.branch, "master");
        assert_eq!(outcome.new_head, Some(CommitId("new-c".to_string())));
        assert_eq!(
            git.calls(),
            vec![
                Call::Recommit {
                    original: "a".to_string(),
                    parent: None,
                    message: "Add parser".to_string(),
                },
                Call::Recommit {
                    original: "b".to_string(),
                    parent: Some("new-a".to_string()),
                    message: "Fix lexer".to_string(),
                },
                Call::Recommit {
                    original: "c".to_string(),
                    parent: Some("new-b".to_string()),
                    message: "Bump version".to_string(),
                },
                Call::MoveBranch {
                    branch: "master".to_string(),
                    new_head: "new-c".to_string(),
                    old_head: "c".to_string(),
                },
                Call::Checkout("master".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn dry_run_leaves_repository_untouched() {
        let mut fake = FakeGit::linear(&["a", "b"]);
        fake.dirty = true;
        let git = Arc::new(fake);
        let ctx = context(config(), git.clone(), ScriptedModel::new(&["One", "Two"]));

        let mut reported = 0;
        let outcome = rewrite_history(
            &ctx,
            RewriteOptions {
                branch: None,
                dry_run: true,
            },
            &mut StdRng::seed_from_u64(2),
            |_| reported += 1,
        )
        .await
        .unwrap();

        assert_eq!(reported, 2);
        assert_eq!(outcome.rewritten, 2);
        assert!(outcome.dry_run);
        assert!(outcome.new_head.is_none());
        assert!(git.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_history_is_not_an_error() {
        let git = Arc::new(FakeGit::linear(&[]));
        let ctx = context(config(), git.clone(), ScriptedModel::new(&[]));

        let outcome = rewrite_history(
            &ctx,
            RewriteOptions::default(),
            &mut StdRng::seed_from_u64(3),
            |_| panic!("no progress expected"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.rewritten, 0);
        assert!(git.calls().is_empty());
    }

    #[tokio::test]
    async fn refuses_merge_commits() {
        let mut fake = FakeGit::linear(&["a", "b", "c"]);
        fake.commits[2].parents.push(CommitId("side".to_string()));
        let git = Arc::new(fake);
        let ctx = context(config(), git.clone(), ScriptedModel::new(&["x", "y", "z"]));

        let err = rewrite_history(
            &ctx,
            RewriteOptions::default(),
            &mut StdRng::seed_from_u64(4),
            |_| {},
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("only linear history"));
        assert!(git.calls().is_empty());
    }

    #[tokio::test]
    async fn dirty_worktree_blocks_rewrite() {
        let mut fake = FakeGit::linear(&["a"]);
        fake.dirty = true;
        let git = Arc::new(fake);
        let ctx = context(config(), git.clone(), ScriptedModel::new(&["x"]));

        let result = rewrite_history(
            &ctx,
            RewriteOptions::default(),
            &mut StdRng::seed_from_u64(5),
            |_| {},
        )
        .await;

        assert!(result.is_err());
        assert!(git.listed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn retries_unusable_generations() {
        let git = Arc::new(FakeGit::linear(&["a"]));
        let ctx = context(
            config(),
            git.clone(),
            ScriptedModel::new(&["   ", "Generated commit message:", "Fix typo"]),
        );

        rewrite_history(
            &ctx,
            RewriteOptions::default(),
            &mut StdRng::seed_from_u64(6),
            |progress| assert_eq!(progress.rewrite.message.as_str(), "Fix typo"),
        )
        .await
        .unwrap();

        assert_eq!(git.calls().len(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let git = Arc::new(FakeGit::linear(&["a"]));
        let mut config = config();
        config.generation_attempts = 2;
        let ctx = context(
            config,
            git.clone(),
            ScriptedModel::new(&["", "\"\"", "Never reached"]),
        );

        let err = rewrite_history(
            &ctx,
            RewriteOptions::default(),
            &mut StdRng::seed_from_u64(7),
            |_| {},
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "language model error: no usable commit message after 2 attempt(s)"
        );
        assert!(git.calls().is_empty());
    }

    #[tokio::test]
    async fn branch_option_overrides_config_and_current() {
        let git = Arc::new(FakeGit::linear(&["a"]));
        let mut config = config();
        config.branch = Some("trunk".to_string());
        let ctx = context(config, git.clone(), ScriptedModel::new(&["x", "y"]));

        let outcome = rewrite_history(
            &ctx,
            RewriteOptions {
                branch: Some("release".to_string()),
                dry_run: true,
            },
            &mut StdRng::seed_from_u64(8),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(outcome.branch, "release");

        let outcome = rewrite_history(
            &ctx,
            RewriteOptions {
                branch: None,
                dry_run: true,
            },
            &mut StdRng::seed_from_u64(8),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(outcome.branch, "trunk");
        assert_eq!(
            *git.listed.lock().unwrap(),
            vec!["release".to_string(), "trunk".to_string()]
        );
    }

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .expect("failed to run git");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn commit_file(dir: &Path, name: &str, contents: &str, message: &str) {
        fs::write(dir.join(name), contents).expect("failed to write file");
        git(dir, &["add", name]);
        git(dir, &["commit", "--quiet", "-m", message]);
    }

    #[tokio::test]
    async fn rewrites_named_branch_of_real_repository() {
        let repo = TempDir::new().expect("failed to create temp dir");
        let dir = repo.path();
        git(dir, &["init", "--quiet", "--initial-branch=master"]);
        git(dir, &["config", "user.name", "Original Author"]);
        git(dir, &["config", "user.email", "original@example.com"]);
        git(dir, &["config", "commit.gpgsign", "false"]);
        commit_file(dir, "a.txt", "one", "first");
        commit_file(dir, "b.txt", "two", "second");
        git(dir, &["checkout", "--quiet", "-b", "feature"]);
        commit_file(dir, "c.txt", "three", "third");
        git(dir, &["checkout", "--quiet", "master"]);

        let master_before = git(dir, &["rev-parse", "master"]);
        let trees_before = git(dir, &["log", "--reverse", "--format=%T", "feature"]);

        let ctx = AppContext::new(
            config(),
            Arc::new(GitCli::open(dir).unwrap()),
            Arc::new(ScriptedModel::new(&[
                "Set up project",
                "Sure! Add parser",
                "\"Wire up CLI\"",
            ])),
        );
        let outcome = rewrite_history(
            &ctx,
            RewriteOptions {
                branch: Some("feature".to_string()),
                dry_run: false,
            },
            &mut StdRng::seed_from_u64(11),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(outcome.rewritten, 3);
        assert_eq!(git(dir, &["symbolic-ref", "--short", "HEAD"]), "feature");
        assert_eq!(
            outcome.new_head.map(|id| id.to_string()),
            Some(git(dir, &["rev-parse", "feature"]))
        );
        assert_eq!(
            git(dir, &["log", "--reverse", "--format=%T", "feature"]),
            trees_before
        );
        assert_eq!(
            git(
                dir,
                &["log", "--reverse", "--format=%s|%an|%ae|%cn|%ce", "feature"]
            )
            .lines()
            .collect::<Vec<_>>(),
            vec![
                "Set up project|Ada Lovelace|ada@example.com|Ada Lovelace|ada@example.com",
                "Add parser|Ada Lovelace|ada@example.com|Ada Lovelace|ada@example.com",
                "Wire up CLI|Ada Lovelace|ada@example.com|Ada Lovelace|ada@example.com",
            ]
        );
        let dates = git(
            dir,
            &["log", "--format=%ad", "--date=format:%Y-%m", "feature"],
        );
        assert!(dates.lines().all(|month| month == "2024-01"));
        assert_eq!(git(dir, &["rev-parse", "master"]), master_before);
        assert_eq!(git(dir, &["status", "--porcelain"]), "");
    }
}
