use chrono::{DateTime, Local, TimeZone, Utc};

use crate::domain::eligibility::ClaimEligibility;
use crate::domain::evolution::classify;
use crate::domain::ranking::global_rank;
use crate::models::{AdminStats, Claim, EvolutionPool, User, UserStats};

/// Start of the current local calendar day, as a UTC instant
pub fn local_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now.with_timezone(&Local).date_naive().and_hms_opt(0, 0, 0);
    match midnight {
        Some(naive) => match naive.and_local_timezone(Local).earliest() {
            Some(local) => local.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&naive),
        },
        None => now,
    }
}

/// Sum of claim amounts at or after `since`
pub fn daily_earnings(claims: &[Claim], since: DateTime<Utc>) -> i64 {
    claims
        .iter()
        .filter(|claim| claim.claimed_at >= since)
        .map(|claim| claim.amount)
        .sum()
}

/// Assemble the dashboard view of `user` from a snapshot of all users and its claims
pub fn user_stats(
    user: User,
    all_users: &[User],
    claims: &[Claim],
    eligibility: ClaimEligibility,
    now: DateTime<Utc>,
) -> UserStats {
    let evolution = classify(user.points);
    // The user may have been created after the snapshot was read
    let global_rank = global_rank(all_users, user.id).unwrap_or(all_users.len() as i64 + 1);

    UserStats {
        evol_name: evolution.label(),
        evol_level: evolution.level,
        global_rank,
        next_evol_target: evolution.next_target,
        progress_percentage: evolution.progress_percentage(user.points),
        can_claim: eligibility.can_claim,
        time_until_next_claim: eligibility.time_until_next_claim,
        daily_earnings: daily_earnings(claims, local_day_start(now)),
        total_claims: claims.len() as i64,
        user,
    }
}

pub fn admin_stats(users: &[User], pools: Vec<EvolutionPool>) -> AdminStats {
    let total_distributed: i64 = users.iter().map(|u| u.points).sum();
    let capacity: i64 = pools.iter().map(|p| p.total_pool).sum();
    let used: i64 = pools.iter().map(|p| p.used_pool).sum();

    let pool_usage_percentage = if capacity == 0 {
        0
    } else {
        ((used as f64 / capacity as f64) * 100.0).round() as i64
    };

    AdminStats {
        total_users: users.len() as i64,
        total_distributed,
        pool_usage_percentage,
        evol_pools: pools,
    }
}
