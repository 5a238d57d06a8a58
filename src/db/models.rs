use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wizard::session::Session;

/// Per-user durable document: the two containers that survive session
/// resets. Stored as one JSON column per user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(default)]
    pub recent_prompts: Vec<String>,
    #[serde(default)]
    pub saved_settings: Option<Session>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}
