//! Player account lookups.

use std::future::Future;
use std::sync::Arc;

use terrabound_protocol::PlayerId;

use crate::AccountError;

/// Read access to player accounts.
pub trait AccountStore: Send + Sync {
    /// The player's skill rating.
    ///
    /// `Ok(None)` means the account exists but has no usable rating.
    /// `Err` means the lookup itself failed.
    fn skill_rating(
        &self,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<Option<i32>, AccountError>> + Send;
}

impl<T: AccountStore> AccountStore for Arc<T> {
    fn skill_rating(
        &self,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<Option<i32>, AccountError>> + Send {
        (**self).skill_rating(player_id)
    }
}

/// Extracts the numeric `elo` field from account metadata JSON.
///
/// Fractional ratings are truncated. Anything else (invalid JSON, no
/// `elo`, a non-number) yields `None`.
pub fn parse_skill_rating(metadata: &str) -> Option<i32> {
    let value: serde_json::Value = serde_json::from_str(metadata).ok()?;
    let elo = value.get("elo")?.as_f64()?;
    Some(elo as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_rating() {
        assert_eq!(parse_skill_rating(r#"{"elo": 1450}"#), Some(1450));
    }

    #[test]
    fn test_parse_truncates_fraction() {
        assert_eq!(parse_skill_rating(r#"{"elo": 999.9}"#), Some(999));
    }

    #[test]
    fn test_parse_ignores_other_fields() {
        assert_eq!(parse_skill_rating(r#"{"name": "x", "elo": 7}"#), Some(7));
    }

    #[test]
    fn test_parse_rejects_missing_or_wrong_type() {
        assert_eq!(parse_skill_rating("{}"), None);
        assert_eq!(parse_skill_rating(r#"{"elo": "1200"}"#), None);
        assert_eq!(parse_skill_rating("not json"), None);
        assert_eq!(parse_skill_rating(""), None);
    }
}
