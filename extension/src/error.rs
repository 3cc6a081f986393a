// Error type shared by the cashback core and its browser adapters

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CashbackError {
    /// SET was called without a usable address. The display text doubles as the
    /// wire `error` string.
    #[error("No address provided")]
    MissingAddress,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("account query failed: {0}")]
    Accounts(String),

    #[error("failed to open {surface}: {reason}")]
    Surface {
        surface: &'static str,
        reason: String,
    },

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CashbackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_address_wire_text() {
        assert_eq!(CashbackError::MissingAddress.to_string(), "No address provided");
    }

    #[test]
    fn test_surface_error_names_surface() {
        let err = CashbackError::Surface {
            surface: "selection popup",
            reason: "no window".into(),
        };
        assert_eq!(err.to_string(), "failed to open selection popup: no window");
    }
}
