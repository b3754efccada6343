//! Tests for error taxonomy

#[cfg(test)]
mod tests {
    use super::super::error::*;

    #[test]
    fn test_insufficient_data_classification() {
        let err = Error::InsufficientData("consensus: 2 bookmakers".to_string());
        assert!(err.is_insufficient_data());
        assert!(!err.is_configuration());
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(Error::UnknownModel("magic".to_string()).is_configuration());
        assert!(Error::InvalidModelConfig("no sources".to_string()).is_configuration());
        assert!(!Error::Internal("x".to_string()).is_configuration());
    }

    #[test]
    fn test_store_classification() {
        assert!(Error::StoreUnavailable("timeout".to_string()).is_store_unavailable());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(Error::from(io).is_store_unavailable());
        assert!(!Error::UnknownModel("x".to_string()).is_store_unavailable());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::UnknownModel("magic".to_string());
        assert_eq!(err.to_string(), "Unknown model: magic");

        let err = Error::InvalidStateTransition {
            from: "COMPLETE".to_string(),
            to: "RUNNING".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition: from COMPLETE to RUNNING"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
