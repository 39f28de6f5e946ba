use crate::error::{AppError, AppResult};

/// Name and email written as both author and committer of every rewritten commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorIdentity {
    pub name: String,
    pub email: String,
}

impl AuthorIdentity {
    pub fn new(name: &str, email: &str) -> AppResult<Self> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(AppError::Configuration(
                "git user name must not be empty".to_string(),
            ));
        }
        if email.is_empty() {
            return Err(AppError::Configuration(
                "git user email must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
        })
    }
}
