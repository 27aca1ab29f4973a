use serde_json::{Map, Value};

use gasoline_bridge::{Level, LogPayload};
use gasoline_network::{CapturedRequest, CapturedResponse};

/// Builds a `GASOLINE_LOG`-shaped network-exchange payload from a
/// captured request/response pair. `status >= 400` is the only thing
/// that promotes the event to `Level::Error`; everything else is
/// `Level::Info`. The fetch tap itself posts captured exchanges as a
/// flat `GASOLINE_NETWORK_BODY` event instead; this stays as a
/// `LogPayload`-shaped alternative for callers that want the exchange
/// folded into the log stream.
pub fn build_network_payload(
    request_id: String,
    request: CapturedRequest,
    response: Option<&CapturedResponse>,
    duration_ms: f64,
) -> LogPayload {
    let level = match response {
        Some(resp) if resp.status >= 400 => Level::Error,
        None => Level::Error,
        _ => Level::Info,
    };

    let mut fields = Map::new();
    fields.insert("requestId".to_string(), Value::String(request_id));
    fields.insert("durationMs".to_string(), json_number(duration_ms));
    if let Ok(req) = serde_json::to_value(&request) {
        fields.insert("request".to_string(), req);
    }
    if let Some(resp) = response {
        if let Ok(resp) = serde_json::to_value(resp) {
            fields.insert("response".to_string(), resp);
        }
    }

    LogPayload {
        level,
        event_type: "network".to_string(),
        message: Some(format!("{} {}", request.method, request.url)),
        error_message: None,
        first_serialized_arg: None,
        source: Some(request.url),
        fields,
        extra_enrichments: Vec::new(),
    }
}

fn json_number(v: f64) -> Value {
    serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasoline_network::BodyCapture;

    fn request() -> CapturedRequest {
        CapturedRequest {
            url: "https://api.example.com/v1/widgets".to_string(),
            method: "GET".to_string(),
            headers: vec![],
            body: None,
        }
    }

    #[test]
    fn successful_response_is_info_level() {
        let response = CapturedResponse {
            status: 200,
            headers: vec![],
            body: Some(BodyCapture {
                body: "{}".to_string(),
                truncated: false,
            }),
        };
        let payload = build_network_payload("req_0".to_string(), request(), Some(&response), 12.5);
        assert_eq!(payload.level, Level::Info);
        assert_eq!(payload.event_type, "network");
    }

    #[test]
    fn server_error_response_is_error_level() {
        let response = CapturedResponse {
            status: 500,
            headers: vec![],
            body: None,
        };
        let payload = build_network_payload("req_1".to_string(), request(), Some(&response), 1.0);
        assert_eq!(payload.level, Level::Error);
    }

    #[test]
    fn missing_response_is_error_level() {
        let payload = build_network_payload("req_2".to_string(), request(), None, 5.0);
        assert_eq!(payload.level, Level::Error);
    }
}
