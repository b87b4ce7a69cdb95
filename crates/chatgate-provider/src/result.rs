//! The uniform dispatch result.

/// Outcome of one dispatch, as exchanged with the chat surface.
///
/// Serializes to `{"success": true, "data": "..."}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum DispatchResult {
    /// The backend replied.
    Success {
        /// Always `true`.
        success: bool,
        /// Reply text.
        data: String,
    },
    /// Any failure, rendered as a message.
    Failure {
        /// Human-readable error message.
        error: String,
    },
}

impl DispatchResult {
    /// A successful result carrying `data`.
    pub fn success(data: impl Into<String>) -> Self {
        Self::Success {
            success: true,
            data: data.into(),
        }
    }

    /// A failed result carrying `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Whether the backend replied.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { success: true, .. })
    }

    /// Reply text, if successful.
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    /// Error message, if failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error } => Some(error),
            Self::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_serialize_wire_shapes() {
        assert_eq!(
            serde_json::to_value(DispatchResult::success("Hi")).unwrap(),
            json!({"success": true, "data": "Hi"})
        );
        assert_eq!(
            serde_json::to_value(DispatchResult::failure("boom")).unwrap(),
            json!({"error": "boom"})
        );
    }

    #[test]
    fn test_should_deserialize_wire_shapes() {
        let ok: DispatchResult = serde_json::from_str(r#"{"success":true,"data":"Hi"}"#).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.data(), Some("Hi"));

        let err: DispatchResult = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(!err.is_success());
        assert_eq!(err.error(), Some("boom"));
    }
}
