//! Human-readable order numbers.

use chrono::Utc;
use rand::Rng;

/// Generates an order number from the current time and a random suffix.
///
/// Order numbers are for display only and are not guaranteed unique.
pub fn generate_order_number() -> String {
    let random = rand::thread_rng().gen_range(0..=99_999);
    format_order_number(Utc::now().timestamp(), random)
}

/// Formats `ORD-` + last 3 digits of `timestamp` + `random` zero-padded to 5
/// digits.
pub fn format_order_number(timestamp: i64, random: u32) -> String {
    format!("ORD-{:03}{:05}", timestamp.rem_euclid(1000), random % 100_000)
}
