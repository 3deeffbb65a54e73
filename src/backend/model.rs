use serde::{Deserialize, Serialize};

use crate::model::Status;

/// Error body returned by the REST layer.
#[derive(Deserialize, Debug, Default)]
pub struct ApiError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiError {
    /// Best human-readable message; falls back to the raw body.
    pub fn describe(body: &str) -> String {
        match serde_json::from_str::<ApiError>(body) {
            Ok(ApiError {
                message: Some(message),
                details,
                ..
            }) => match details {
                Some(d) if !d.is_empty() => format!("{} ({})", message, d),
                _ => message,
            },
            _ if body.trim().is_empty() => "empty response body".to_string(),
            _ => body.trim().to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct StatusPatch {
    pub status: Status,
}

#[derive(Serialize, Debug)]
pub struct ScanArgs<'a> {
    pub artisanid: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_prefers_message_and_details() {
        let body = r#"{"code":"22P02","message":"invalid input syntax","details":"for type uuid","hint":null}"#;
        assert_eq!(ApiError::describe(body), "invalid input syntax (for type uuid)");
        assert_eq!(ApiError::describe("gateway timeout"), "gateway timeout");
        assert_eq!(ApiError::describe(""), "empty response body");
    }

    #[test]
    fn status_patch_serializes_enum_name() {
        let body = serde_json::to_value(StatusPatch { status: Status::Approved }).unwrap();
        assert_eq!(body["status"], "Approved");
    }
}
