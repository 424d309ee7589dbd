use serde::{Deserialize, Serialize};

/// Public slice of a user profile, joined onto every comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}
