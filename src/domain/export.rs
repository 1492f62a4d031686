use chrono::SecondsFormat;

use crate::models::User;

pub const CSV_HEADER: &str = "User ID,Telegram ID,Username,Points,Wallet,Referrals,Created At";
pub const EXPORT_FILENAME: &str = "gxr_users.csv";

/// Header line followed by one line per user, fields written as-is
pub fn users_csv(users: &[User]) -> String {
    let rows: Vec<String> = users
        .iter()
        .map(|user| {
            format!(
                "{},{},{},{},{},{},{}",
                user.id,
                user.telegram_id,
                user.username.as_deref().unwrap_or(""),
                user.points,
                user.wallet.as_deref().unwrap_or(""),
                user.total_referrals,
                user.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            )
        })
        .collect();

    format!("{}\n{}", CSV_HEADER, rows.join("\n"))
}
