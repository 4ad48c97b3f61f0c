pub mod collaborate;
pub mod delegate;
pub mod find;
pub mod recommend;
pub mod status;

use ac_core::types::Priority;
use serde::Serialize;

/// Pretty-print any serializable value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Accept either a label (`low`, `medium`, `high`, `critical`) or a number
/// in 1..=5.
pub fn parse_priority(value: &str) -> anyhow::Result<Priority> {
    match value.parse::<u8>() {
        Ok(n) => Ok(Priority::new(n)?),
        Err(_) => match value.trim().to_ascii_lowercase().as_str() {
            "low" | "medium" | "high" | "critical" => Ok(Priority::from_label(value)),
            other => anyhow::bail!("unknown priority `{other}`"),
        },
    }
}
