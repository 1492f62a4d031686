use std::cmp::Ordering;

use crate::domain::evolution::classify;
use crate::models::{LeaderboardEntry, User};

/// Points descending, ties broken by ascending id
fn rank_order(a: &User, b: &User) -> Ordering {
    b.points.cmp(&a.points).then_with(|| a.id.cmp(&b.id))
}

/// Sort a user snapshot into ranking order
pub fn sort_for_ranking(users: &mut [User]) {
    users.sort_by(rank_order);
}

/// 1-based position of `user_id` in the ranking, `None` if absent
pub fn global_rank(users: &[User], user_id: i64) -> Option<i64> {
    let target = users.iter().find(|u| u.id == user_id)?;
    let ahead = users
        .iter()
        .filter(|u| rank_order(u, target) == Ordering::Less)
        .count();
    Some(ahead as i64 + 1)
}

/// Ranked slice of users, optionally restricted to one tier
///
/// `rank` is the position within the returned slice, not the global rank.
pub fn leaderboard(
    mut users: Vec<User>,
    tier_filter: Option<i32>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    sort_for_ranking(&mut users);

    users
        .into_iter()
        .filter_map(|user| {
            let evolution = classify(user.points);
            match tier_filter {
                Some(level) if evolution.level != level => None,
                _ => Some((user, evolution)),
            }
        })
        .take(limit)
        .enumerate()
        .map(|(index, (user, evolution))| LeaderboardEntry {
            user,
            evol_name: evolution.label(),
            rank: index as i64 + 1,
        })
        .collect()
}
