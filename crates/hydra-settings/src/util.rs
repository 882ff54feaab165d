//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Next `updatedAt` for a local edit: wall clock, but never behind `current`.
pub fn next_timestamp(current: i64) -> i64 {
    let now = unix_millis_now();
    if now > current {
        now
    } else {
        current.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" file:///downloads ".to_string())),
            Some("file:///downloads".to_string())
        );
    }

    #[test]
    fn next_timestamp_never_moves_backwards() {
        let far_future = unix_millis_now() + 60_000;
        assert_eq!(next_timestamp(far_future), far_future + 1);
        assert!(next_timestamp(0) > 0);
    }
}
