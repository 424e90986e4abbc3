//! Utility functions for the rating ledger

use crate::error::{RatingError, Result};
use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Trim and lower-case a player, game or team name and check it is usable as a
/// record identifier
pub fn normalize_name(kind: &'static str, raw: &str) -> Result<String> {
    let name = raw.trim().to_lowercase();

    if name.is_empty() {
        return Err(RatingError::InvalidName {
            kind,
            name,
            reason: "name is required".to_string(),
        });
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(RatingError::InvalidName {
            kind,
            name,
            reason: "only letters, numbers and underscores are allowed".to_string(),
        });
    }

    Ok(name)
}

/// Display form of a stored name: underscores become spaces, words capitalized
pub fn display_name(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
