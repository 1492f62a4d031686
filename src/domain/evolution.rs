/// A single evolution tier: level, display name, and the minimum points to reach it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    pub level: i32,
    pub name: &'static str,
    pub min_points: i64,
}

/// Tier table in ascending order of `min_points`
pub const TIERS: [Tier; 7] = [
    Tier { level: 1, name: "Rookie", min_points: 0 },
    Tier { level: 2, name: "Charger", min_points: 50 },
    Tier { level: 3, name: "Breaker", min_points: 15_000 },
    Tier { level: 4, name: "Phantom", min_points: 30_000 },
    Tier { level: 5, name: "Overdrive", min_points: 50_000 },
    Tier { level: 6, name: "Genesis", min_points: 80_000 },
    Tier { level: 7, name: "Final Form", min_points: 120_000 },
];

pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 7;

/// Tier derived from a point total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evolution {
    pub level: i32,
    pub name: &'static str,
    /// Minimum of the next tier, or of the top tier once reached
    pub next_target: i64,
}

impl Evolution {
    /// Label shown to users, e.g. `Evol 2 – Charger`
    pub fn label(&self) -> String {
        format!("Evol {} – {}", self.level, self.name)
    }

    pub fn is_max(&self) -> bool {
        self.level == MAX_LEVEL
    }

    /// Progress towards the next tier, fixed at 100 on the top tier
    pub fn progress_percentage(&self, points: i64) -> i64 {
        if self.is_max() || self.next_target <= 0 {
            return 100;
        }
        ((points as f64 / self.next_target as f64) * 100.0).floor() as i64
    }
}

/// Highest tier whose minimum is at or below `points`
pub fn classify(points: i64) -> Evolution {
    let index = TIERS
        .iter()
        .rposition(|tier| tier.min_points <= points)
        .unwrap_or(0);
    let tier = TIERS[index];
    let next_target = TIERS
        .get(index + 1)
        .map(|next| next.min_points)
        .unwrap_or(tier.min_points);

    Evolution {
        level: tier.level,
        name: tier.name,
        next_target,
    }
}

pub fn is_valid_level(level: i32) -> bool {
    (MIN_LEVEL..=MAX_LEVEL).contains(&level)
}
