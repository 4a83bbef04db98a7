use crate::protocol::error::{MiniRpcError, Result};
use crate::protocol::{Request, Response};

/// JSON codec for the request and response envelopes.
///
/// Encoding failures surface as [`MiniRpcError::Serialization`]; any payload
/// that is not UTF-8 JSON of the expected shape decodes to
/// [`MiniRpcError::MalformedEnvelope`].
///
/// # Example
///
/// ```
/// use minirpc_common::transport::JsonCodec;
/// use minirpc_common::protocol::{Request, Response};
/// use serde_json::json;
///
/// let request = Request::new("add", vec![json!(2), json!(3)]);
/// let encoded = JsonCodec::encode_request(&request).unwrap();
/// let decoded = JsonCodec::decode_request(&encoded).unwrap();
/// assert_eq!(request, decoded);
///
/// let response = Response::result(json!(5));
/// let encoded = JsonCodec::encode_response(&response).unwrap();
/// let decoded = JsonCodec::decode_response(&encoded).unwrap();
/// assert_eq!(response, decoded);
/// ```
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a request to bytes
    pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(request)?)
    }

    /// Decode a request from bytes
    ///
    /// # Errors
    ///
    /// Returns `MalformedEnvelope` if the data is not JSON or any of `_name`,
    /// `args` and `kwargs` is missing or has the wrong type.
    pub fn decode_request(data: &[u8]) -> Result<Request> {
        serde_json::from_slice(data)
            .map_err(|e| MiniRpcError::MalformedEnvelope(format!("bad request: {}", e)))
    }

    /// Encode a response to bytes
    pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(response)?)
    }

    /// Decode a response from bytes
    ///
    /// # Errors
    ///
    /// Returns `MalformedEnvelope` if the data is not JSON or the `type`
    /// discriminator is missing or is neither `result` nor `error`.
    pub fn decode_response(data: &[u8]) -> Result<Response> {
        serde_json::from_slice(data)
            .map_err(|e| MiniRpcError::MalformedEnvelope(format!("bad response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_codec_round_trip() {
        let request = Request::new("test_method", vec![json!(42), json!("x")])
            .with_kwarg("flag", json!(true));

        let encoded = JsonCodec::encode_request(&request).unwrap();
        let decoded = JsonCodec::decode_request(&encoded).unwrap();

        assert_eq!(request, decoded);
    }

    #[test]
    fn test_json_codec_response_round_trip() {
        let response = Response::result(json!({"result": "success"}));

        let encoded = JsonCodec::encode_response(&response).unwrap();
        let decoded = JsonCodec::decode_response(&encoded).unwrap();

        assert_eq!(response, decoded);
    }

    #[test]
    fn test_error_response() {
        let response = Response::error("RuntimeError", "Test error message");

        let encoded = JsonCodec::encode_response(&response).unwrap();
        let decoded = JsonCodec::decode_response(&encoded).unwrap();

        assert_eq!(response, decoded);
        assert!(!decoded.is_result());
    }

    #[test]
    fn test_complex_json_values() {
        let request = Request::new(
            "complex_method",
            vec![
                json!({
                    "nested": {
                        "array": [1, 2, 3, "four", null],
                        "boolean": true,
                        "number": 42.5,
                        "string": "test"
                    }
                }),
                json!(null),
            ],
        );

        let encoded = JsonCodec::encode_request(&request).unwrap();
        let decoded = JsonCodec::decode_request(&encoded).unwrap();

        assert_eq!(request, decoded);
    }

    #[test]
    fn test_request_missing_kwargs_is_malformed() {
        let err = JsonCodec::decode_request(br#"{"_name": "add", "args": [1]}"#).unwrap_err();
        assert!(matches!(err, MiniRpcError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_request_with_plain_method_key_is_malformed() {
        let err = JsonCodec::decode_request(br#"{"method": "add", "args": [], "kwargs": {}}"#)
            .unwrap_err();
        assert!(matches!(err, MiniRpcError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_request_args_must_be_array() {
        let err = JsonCodec::decode_request(br#"{"_name": "add", "args": {}, "kwargs": {}}"#)
            .unwrap_err();
        assert!(matches!(err, MiniRpcError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_response_unknown_type_is_malformed() {
        let err = JsonCodec::decode_response(br#"{"type": "maybe", "content": 1}"#).unwrap_err();
        assert!(matches!(err, MiniRpcError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_response_missing_type_is_malformed() {
        let err = JsonCodec::decode_response(br#"{"content": 1}"#).unwrap_err();
        assert!(matches!(err, MiniRpcError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = JsonCodec::decode_request(&[0xFF, 0xFE, 0xFD]).unwrap_err();
        assert!(matches!(err, MiniRpcError::MalformedEnvelope(_)));
    }
}
