use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Prefix of every referral code; the remainder is the owner's internal id
pub const REFERRAL_CODE_PREFIX: &str = "REF";

/// Farming user - field names match the dashboard's JSON contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub telegram_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub points: i64,
    pub last_claim: Option<DateTime<Utc>>,
    pub wallet: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub total_referrals: i64,
    pub ref_applied: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Referral codes are derived from the internal id and never change
    pub fn referral_code_for(id: i64) -> String {
        format!("{}{}", REFERRAL_CODE_PREFIX, id)
    }
}

/// Fields accepted when a user is first seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub telegram_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl NewUser {
    /// Lazily created dashboard user: `User` + last 6 characters of the telegram id
    pub fn from_telegram_id(telegram_id: &str) -> Self {
        let tail: String = {
            let chars: Vec<char> = telegram_id.chars().collect();
            let start = chars.len().saturating_sub(6);
            chars[start..].iter().collect()
        };

        Self {
            telegram_id: telegram_id.to_string(),
            username: Some(format!("User{}", tail)),
            email: None,
            is_admin: false,
        }
    }
}

/// Canonical task categories
///
/// Older seed data and the bot used `collab` / `partner`; both are accepted on input and
/// normalized, only the long names are ever written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Original,
    #[serde(alias = "collab")]
    Collaborator,
    #[serde(alias = "partner")]
    Partnership,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Collaborator => "collaborator",
            Self::Partnership => "partnership",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "collaborator" | "collab" => Ok(Self::Collaborator),
            "partnership" | "partner" => Ok(Self::Partnership),
            other => Err(format!("Unknown task category: {}", other)),
        }
    }
}

/// Static task catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub category: TaskCategory,
    pub reward: i64,
    pub description: Option<String>,
    pub link: Option<String>,
    pub is_active: bool,
}

/// Task definition used by seeding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub name: String,
    pub category: TaskCategory,
    pub reward: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Completion record for a (user, task) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserTask {
    pub id: i64,
    pub user_id: i64,
    pub task_id: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Task joined with the user's completion state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithCompletion {
    #[serde(flatten)]
    pub task: Task,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Append-only claim ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub claimed_at: DateTime<Utc>,
}

/// Everything a store needs to apply one claim atomically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimWrite {
    pub user_id: i64,
    pub amount: i64,
    pub claimed_at: DateTime<Utc>,
    /// Tier of the user before the points are added
    pub pool_level: i32,
    /// The write is refused if the user claimed after this instant
    pub cooldown_cutoff: DateTime<Utc>,
}

/// Per-tier distribution counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionPool {
    pub id: i64,
    pub evol_level: i32,
    pub total_pool: i64,
    pub used_pool: i64,
    pub reset_at: Option<DateTime<Utc>>,
}
