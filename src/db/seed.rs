use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::db::errors::{Result, StoreError};
use crate::models::{NewTask, TaskCategory};

/// Capacity of one evolution pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSeed {
    pub evol_level: i32,
    pub total_pool: i64,
}

/// Startup data applied once through `EntityStore::seed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    pub pools: Vec<PoolSeed>,
    #[serde(default)]
    pub tasks: Vec<NewTask>,
}

impl SeedData {
    /// Load seed data from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let seed: SeedData = serde_json::from_str(&raw)?;
        seed.validate()?;

        info!(
            path = %path.display(),
            pools = seed.pools.len(),
            tasks = seed.tasks.len(),
            "Loaded seed data"
        );
        Ok(seed)
    }

    pub fn validate(&self) -> Result<()> {
        for pool in &self.pools {
            if !(1..=7).contains(&pool.evol_level) {
                return Err(StoreError::InvalidData(format!(
                    "Pool level {} is outside 1..=7",
                    pool.evol_level
                )));
            }
            if pool.total_pool < 0 {
                return Err(StoreError::InvalidData(format!(
                    "Pool level {} has negative capacity",
                    pool.evol_level
                )));
            }
        }
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                return Err(StoreError::InvalidData("Task name is required".to_string()));
            }
            if task.reward <= 0 {
                return Err(StoreError::InvalidData(format!(
                    "Task '{}' must have a positive reward",
                    task.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for SeedData {
    /// The launch catalog: seven pools and ten tasks
    fn default() -> Self {
        let pools = [
            (1, 2_500_000),
            (2, 5_000_000),
            (3, 7_500_000),
            (4, 100_000_000),
            (5, 125_000_000),
            (6, 1_500_000_000),
            (7, 2_000_000_000),
        ]
        .into_iter()
        .map(|(evol_level, total_pool)| PoolSeed { evol_level, total_pool })
        .collect();

        let task = |name: &str, category, reward, description: &str, link: &str| NewTask {
            name: name.to_string(),
            category,
            reward,
            description: Some(description.to_string()),
            link: Some(link.to_string()),
            is_active: true,
        };

        let tasks = vec![
            task(
                "Follow Twitter @GXROfficial",
                TaskCategory::Original,
                100,
                "Follow our official Twitter account",
                "https://twitter.com/GXROfficial",
            ),
            task(
                "Join Telegram Channel",
                TaskCategory::Original,
                100,
                "Join our Telegram community",
                "https://t.me/GXROfficial",
            ),
            task(
                "Share Post on Twitter",
                TaskCategory::Original,
                150,
                "Share our latest post",
                "https://twitter.com/GXROfficial",
            ),
            task("Invite 5 Friends", TaskCategory::Original, 500, "Invite 5 friends to join", ""),
            task(
                "Complete KYC Verification",
                TaskCategory::Partnership,
                300,
                "Complete your KYC process",
                "",
            ),
            task(
                "Trade $100 on DEX",
                TaskCategory::Partnership,
                800,
                "Make a trade worth $100",
                "",
            ),
            task(
                "Hold 1000 USDT",
                TaskCategory::Partnership,
                600,
                "Hold 1000 USDT in your wallet",
                "",
            ),
            task(
                "Create Content Video",
                TaskCategory::Collaborator,
                1000,
                "Create a video about GXR",
                "",
            ),
            task(
                "Write Article Review",
                TaskCategory::Collaborator,
                750,
                "Write an article review",
                "",
            ),
            task(
                "Design Banner/Logo",
                TaskCategory::Collaborator,
                500,
                "Design promotional material",
                "",
            ),
        ];

        Self { pools, tasks }
    }
}
