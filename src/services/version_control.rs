use async_trait::async_trait;

use crate::domain::commit::{CommitId, CommitRecord, CommitRewrite};
use crate::error::AppResult;

#[async_trait]
pub trait VersionControlService: Send + Sync {
    /// Name of the checked-out branch. Fails when HEAD is detached.
    async fn current_branch(&self) -> AppResult<String>;
    async fn ensure_clean(&self) -> AppResult<()>;
    /// Commits reachable from `branch`, oldest first.
    async fn list_commits(&self, branch: &str) -> AppResult<Vec<CommitRecord>>;
    /// Writes a new commit carrying `original`'s tree under `parent` with the given metadata.
    async fn recommit(
        &self,
        original: &CommitRecord,
        parent: Option<&CommitId>,
        rewrite: &CommitRewrite,
    ) -> AppResult<CommitId>;
    async fn move_branch(
        &self,
        branch: &str,
        new_head: &CommitId,
        old_head: &CommitId,
    ) -> AppResult<()>;
    async fn checkout(&self, branch: &str) -> AppResult<()>;
}
