use thiserror::Error;

/// Classification of a venue rejection by its error text.
///
/// The venue reports failures as strings; the reconciler and the main loop
/// route on these categories rather than on raw substrings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueErrorKind {
    /// Post-only order would have crossed the book (`POST_ONLY`, `MUST_NOT_FILL`).
    PostOnlyReject,
    /// Cancel targeted an order the venue no longer knows (`ORDER_NOT_FOUND`).
    OrderNotFound,
    /// Margin / open-margin-fraction rejection (`OMF`, `RISK_TRADE`, `margin`).
    Margin,
    /// Venue returned a failure with no usable reason.
    Transient,
    /// Anything else.
    Other,
}

impl VenueErrorKind {
    /// Classify a venue error message.
    pub fn classify(message: &str) -> Self {
        if message.is_empty() || message == "no reason" {
            return VenueErrorKind::Transient;
        }
        if message.contains("POST_ONLY") || message.contains("MUST_NOT_FILL") {
            return VenueErrorKind::PostOnlyReject;
        }
        if message.contains("ORDER_NOT_FOUND") {
            return VenueErrorKind::OrderNotFound;
        }
        if message.contains("OMF") || message.contains("RISK_TRADE") || message.contains("margin") {
            return VenueErrorKind::Margin;
        }
        VenueErrorKind::Other
    }
}

/// Engine error type.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A venue RPC failed (transport or rejected batch).
    #[error("Venue error: {0}")]
    Venue(String),

    /// The venue's info endpoint returned data we could not use.
    #[error("Venue info error: {0}")]
    VenueInfo(String),

    /// An atomic-op result did not line up with the submitted actions.
    #[error("Atomic result mismatch: expected {expected} results, got {got}")]
    AtomicResultMismatch { expected: usize, got: usize },

    /// A price or size failed decimal conversion.
    #[error("Numeric conversion error: {0}")]
    Numeric(String),

    /// Sync gave up after bounded retries.
    #[error("Sync failed after {attempts} attempts: {last_error}")]
    SyncExhausted { attempts: u32, last_error: String },

    /// The engine event channel closed unexpectedly.
    #[error("Event channel closed")]
    ChannelClosed,
}

impl Error {
    /// Create a venue error.
    pub fn venue(msg: impl Into<String>) -> Self {
        Error::Venue(msg.into())
    }

    /// Classification of this error, if it carries a venue message.
    pub fn venue_kind(&self) -> Option<VenueErrorKind> {
        match self {
            Error::Venue(msg) => Some(VenueErrorKind::classify(msg)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_post_only() {
        assert_eq!(
            VenueErrorKind::classify("order rejected: POST_ONLY violation"),
            VenueErrorKind::PostOnlyReject
        );
        assert_eq!(
            VenueErrorKind::classify("MUST_NOT_FILL"),
            VenueErrorKind::PostOnlyReject
        );
    }

    #[test]
    fn test_classify_order_not_found() {
        assert_eq!(
            VenueErrorKind::classify("cancel failed: ORDER_NOT_FOUND"),
            VenueErrorKind::OrderNotFound
        );
    }

    #[test]
    fn test_classify_margin() {
        assert_eq!(VenueErrorKind::classify("OMF too low"), VenueErrorKind::Margin);
        assert_eq!(
            VenueErrorKind::classify("RISK_TRADE rejected"),
            VenueErrorKind::Margin
        );
        assert_eq!(
            VenueErrorKind::classify("insufficient margin for order"),
            VenueErrorKind::Margin
        );
    }

    #[test]
    fn test_classify_transient() {
        assert_eq!(VenueErrorKind::classify(""), VenueErrorKind::Transient);
        assert_eq!(
            VenueErrorKind::classify("no reason"),
            VenueErrorKind::Transient
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(
            VenueErrorKind::classify("internal server error"),
            VenueErrorKind::Other
        );
    }

    #[test]
    fn test_error_venue_kind() {
        let err = Error::venue("POST_ONLY");
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::PostOnlyReject));
        let err = Error::ChannelClosed;
        assert_eq!(err.venue_kind(), None);
    }
}
