use std::fmt;

use crate::domain::identity::AuthorIdentity;
use crate::domain::message::CommitMessage;
use crate::domain::timestamp::CommitTimestamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitId(pub String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        let end = self.0.len().min(7);
        &self.0[..end]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A commit as listed from the branch being rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: CommitId,
    pub tree: String,
    pub parents: Vec<CommitId>,
}

impl CommitRecord {
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// New metadata for one commit. The tree is always taken from the original.
#[derive(Debug, Clone)]
pub struct CommitRewrite {
    pub message: CommitMessage,
    pub timestamp: CommitTimestamp,
    pub identity: AuthorIdentity,
}
