use async_trait::async_trait;

use crate::error::AppResult;

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Returns the raw model output; cleanup happens in the caller.
    async fn generate_commit_message(&self) -> AppResult<String>;
}
