// src/models/user.rs

use serde::{Deserialize, Serialize};

/// Reference to a registered user.
///
/// Wiki endpoints filter by `name`, discussion endpoints by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub name: String,
}

/// Author of a discussion post as reported by the discussion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub id: u64,
    pub name: String,
    /// Avatar image URL, if the author has one
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl PostAuthor {
    /// Reduce to a plain user reference, e.g. for follow-up queries.
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}
