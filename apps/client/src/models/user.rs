use serde::{Deserialize, Serialize};

use crate::models::ids::UserId;

/// `GET /users/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}
