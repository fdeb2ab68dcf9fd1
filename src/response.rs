use serde::Serialize;

/// Success half of the API envelope.
///
/// Every successful response body has the shape
/// `{"success": true, "message": "...", ...payload}` with the payload fields
/// flattened alongside the flag. Failures are produced by
/// [`crate::error::ApiError`], so a handler returning
/// `Result<Json<Envelope<T>>, ApiError>` covers both halves.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Payload for responses that carry only the flag and a message.
/// A braced struct so serde can flatten it (a unit type cannot be).
#[derive(Debug, Serialize)]
pub struct NoData {}

impl Envelope<NoData> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::with_message(message, NoData {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn ok_flattens_payload_and_skips_message() {
        let json = serde_json::to_value(Envelope::ok(Payload { value: 7 })).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["value"], 7);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn message_only_serializes_flag_and_message() {
        let json = serde_json::to_value(Envelope::message_only("Product deleted")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Product deleted");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn with_message_includes_message() {
        let json =
            serde_json::to_value(Envelope::with_message("done", Payload { value: 1 })).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "done");
        assert_eq!(json["value"], 1);
    }
}
