use chrono::Duration;
use std::path::PathBuf;
use std::str::FromStr;

/// Default claim reward in points
pub const DEFAULT_CLAIM_AMOUNT: i64 = 250;
/// Default cooldown between claims: 6 hours
pub const DEFAULT_CLAIM_COOLDOWN_SECS: i64 = 6 * 60 * 60;
/// Default reward credited to each side of a referral
pub const DEFAULT_REFERRAL_REWARD: i64 = 50;
/// Default leaderboard size
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 100;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Reward rules applied by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardConfig {
    pub claim_amount: i64,
    pub claim_cooldown: Duration,
    pub referral_reward: i64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            claim_amount: DEFAULT_CLAIM_AMOUNT,
            claim_cooldown: Duration::seconds(DEFAULT_CLAIM_COOLDOWN_SECS),
            referral_reward: DEFAULT_REFERRAL_REWARD,
        }
    }
}

impl RewardConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cooldown_secs = env_or("CLAIM_COOLDOWN_SECS", DEFAULT_CLAIM_COOLDOWN_SECS).max(0);

        Self {
            claim_amount: env_or("CLAIM_AMOUNT", defaults.claim_amount).max(1),
            claim_cooldown: Duration::seconds(cooldown_secs),
            referral_reward: env_or("REFERRAL_REWARD", defaults.referral_reward).max(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub rewards: RewardConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let storage = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Memory,
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set when STORAGE_BACKEND=postgres".to_string());
        }

        Ok(Self {
            port: env_or("PORT", 3000),
            storage,
            database_url,
            seed_file: std::env::var("SEED_FILE").ok().map(PathBuf::from),
            rewards: RewardConfig::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_config_from_env() {
        // Test with no env vars set
        let config = RewardConfig::from_env();
        assert_eq!(config, RewardConfig::default());
        assert_eq!(config.claim_cooldown.num_milliseconds(), 21_600_000);

        // Test with env vars set
        unsafe {
            std::env::set_var("CLAIM_AMOUNT", "300");
            std::env::set_var("CLAIM_COOLDOWN_SECS", "60");
            std::env::set_var("REFERRAL_REWARD", "not-a-number");
        }

        let config = RewardConfig::from_env();
        assert_eq!(config.claim_amount, 300);
        assert_eq!(config.claim_cooldown, Duration::seconds(60));
        assert_eq!(config.referral_reward, DEFAULT_REFERRAL_REWARD);

        // Clean up
        unsafe {
            std::env::remove_var("CLAIM_AMOUNT");
            std::env::remove_var("CLAIM_COOLDOWN_SECS");
            std::env::remove_var("REFERRAL_REWARD");
        }
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("Postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
