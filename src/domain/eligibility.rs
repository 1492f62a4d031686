use chrono::{DateTime, Duration, Utc};

/// Whether a user may claim right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimEligibility {
    pub can_claim: bool,
    /// Milliseconds until the cooldown ends, 0 when claimable
    pub time_until_next_claim: i64,
}

impl ClaimEligibility {
    pub fn ready() -> Self {
        Self {
            can_claim: true,
            time_until_next_claim: 0,
        }
    }
}

/// Evaluate the cooldown window against `now`
///
/// A `last_claim` in the future counts as zero elapsed time.
pub fn check(
    last_claim: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> ClaimEligibility {
    let Some(last_claim) = last_claim else {
        return ClaimEligibility::ready();
    };

    let elapsed = (now - last_claim).max(Duration::zero());
    if elapsed >= cooldown {
        return ClaimEligibility::ready();
    }

    // Rounded up so a refusal never reports zero remaining
    let remaining = cooldown - elapsed;
    let mut remaining_ms = remaining.num_milliseconds();
    if remaining > Duration::milliseconds(remaining_ms) {
        remaining_ms += 1;
    }

    ClaimEligibility {
        can_claim: false,
        time_until_next_claim: remaining_ms,
    }
}

/// Latest `last_claim` that still allows a claim at `now`
pub fn cooldown_cutoff(now: DateTime<Utc>, cooldown: Duration) -> DateTime<Utc> {
    now - cooldown
}
