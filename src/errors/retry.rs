/// SQLite error messages that indicate transient faults.
///
/// The backing store gives us no structured signal for "busy, try again";
/// the message text is the only discriminator available. This list is the
/// single place coupled to those message strings.
const TRANSIENT_STORE_ERRORS: &[&str] = &[
    "database is locked",
    "bad parameter",
    "api misuse",
    "disk i/o error",
];

/// Verdict of the transient-store-fault classifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreFault {
    /// Expected to resolve on retry without caller intervention.
    Transient,
    /// Will not resolve on retry; surface immediately.
    Persistent,
}

/// Classify a storage-layer error message as transient or persistent.
///
/// Matching is case-insensitive substring search against a fixed list of
/// known-transient SQLite messages.
pub fn classify_store_fault(message: &str) -> StoreFault {
    let message = message.to_lowercase();
    if TRANSIENT_STORE_ERRORS
        .iter()
        .any(|needle| message.contains(needle))
    {
        StoreFault::Transient
    } else {
        StoreFault::Persistent
    }
}

/// Classification for retry policy.
///
/// Used by the request pipeline to decide how to respond to a failed
/// attempt. Each backoff class has its own independent retry budget so a
/// flaky cache cannot consume the remote-rate-limit budget and vice versa.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the failure is terminal for this call.
    Never,

    /// The remote server rate limited the request (HTTP 429).
    /// Retry with exponential backoff (2s, 4s, 8s, ...), bounded by the
    /// configured 429 retry budget.
    RateLimitBackoff,

    /// The cache store reported a transient fault.
    /// Retry with linear backoff (0.5s, 1.0s, 1.5s, ...), bounded by the
    /// configured transient-store retry budget.
    StoreBackoff,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_transient_messages() {
        assert_eq!(
            classify_store_fault("database is locked"),
            StoreFault::Transient
        );
        assert_eq!(
            classify_store_fault("disk I/O error"),
            StoreFault::Transient
        );
        assert_eq!(
            classify_store_fault("bad parameter or other API misuse"),
            StoreFault::Transient
        );
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(
            classify_store_fault("Database Is Locked (code 5)"),
            StoreFault::Transient
        );
        assert_eq!(classify_store_fault("DISK I/O ERROR"), StoreFault::Transient);
    }

    #[test]
    fn test_substring_match_within_larger_message() {
        assert_eq!(
            classify_store_fault("Sqlite failure: database is locked; retry later"),
            StoreFault::Transient
        );
    }

    #[test]
    fn test_other_messages_are_persistent() {
        assert_eq!(
            classify_store_fault("no such table: responses"),
            StoreFault::Persistent
        );
        assert_eq!(classify_store_fault("constraint failed"), StoreFault::Persistent);
        assert_eq!(classify_store_fault(""), StoreFault::Persistent);
    }
}
