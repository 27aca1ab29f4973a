use serde::{Deserialize, Serialize};

use gasoline_config::{Limits, BINARY_CONTENT_TYPE_RE, SENSITIVE_HEADER_RE, SENSITIVE_URL_RE};

const AUTH_REDACTED: &str = "[REDACTED: auth endpoint]";
const BODY_READ_TIMEOUT_PLACEHOLDER: &str = "[Skipped: body read timeout]";

/// A header list as the host collected it, order preserved.
pub type Headers = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyCapture {
    pub body: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    pub url: String,
    pub method: String,
    pub headers: Headers,
    pub body: Option<BodyCapture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Option<BodyCapture>,
}

/// Raw body as handed to us by the fetch wrapper: either a decoded
/// string it already has in hand, or the fact that reading it raced the
/// body-read timeout and lost.
pub enum RawBody {
    Text(String),
    TimedOut,
}

/// `true` when the URL should never be captured at all: it targets the
/// dev server itself (so we don't recurse into capturing our own
/// telemetry calls) or a browser extension resource.
pub fn is_excluded_url(url: &str, configured_server_url: Option<&str>) -> bool {
    if url.starts_with("chrome-extension://") || url.starts_with("moz-extension://") {
        return true;
    }
    let hosts: Vec<&str> = match configured_server_url {
        Some(u) => vec![u],
        None => gasoline_config::DEFAULT_DEV_SERVER_HOSTS.to_vec(),
    };
    hosts.iter().any(|host| url.contains(host))
}

fn sanitize_headers(headers: &Headers) -> Headers {
    headers
        .iter()
        .filter(|(k, _)| !SENSITIVE_HEADER_RE.is_match(k))
        .cloned()
        .collect()
}

fn content_type(headers: &Headers) -> Option<&str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.as_str())
}

fn truncate_body(body: &str, cap: usize) -> BodyCapture {
    if body.len() <= cap {
        return BodyCapture {
            body: body.to_string(),
            truncated: false,
        };
    }
    let mut end = cap;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    BodyCapture {
        body: body[..end].to_string(),
        truncated: true,
    }
}

fn capture_body(raw: Option<&RawBody>, headers: &Headers, cap: usize) -> Option<BodyCapture> {
    let raw = raw?;
    if let Some(ctype) = content_type(headers) {
        if BINARY_CONTENT_TYPE_RE.is_match(ctype) {
            let len = match raw {
                RawBody::Text(s) => s.len(),
                RawBody::TimedOut => 0,
            };
            return Some(BodyCapture {
                body: format!("[Binary: {} bytes, {}]", len, ctype),
                truncated: false,
            });
        }
    }
    match raw {
        RawBody::Text(s) => Some(truncate_body(s, cap)),
        RawBody::TimedOut => Some(BodyCapture {
            body: BODY_READ_TIMEOUT_PLACEHOLDER.to_string(),
            truncated: false,
        }),
    }
}

/// Builds the captured request/response pair for one fetch (spec.md
/// §4.9). Auth-endpoint URLs get both bodies replaced wholesale rather
/// than truncated; everything else goes through header sanitization,
/// binary detection and per-side truncation independently.
pub fn capture_exchange(
    url: &str,
    method: &str,
    request_headers: &Headers,
    request_body: Option<&RawBody>,
    status: u16,
    response_headers: &Headers,
    response_body: Option<&RawBody>,
    limits: &Limits,
) -> (CapturedRequest, CapturedResponse) {
    let is_auth = SENSITIVE_URL_RE.is_match(url);

    let req_body = if is_auth {
        request_body.map(|_| BodyCapture {
            body: AUTH_REDACTED.to_string(),
            truncated: false,
        })
    } else {
        capture_body(request_body, request_headers, limits.request_body_cap)
    };

    let resp_body = if is_auth {
        response_body.map(|_| BodyCapture {
            body: AUTH_REDACTED.to_string(),
            truncated: false,
        })
    } else {
        capture_body(response_body, response_headers, limits.response_body_cap)
    };

    (
        CapturedRequest {
            url: url.to_string(),
            method: method.to_string(),
            headers: sanitize_headers(request_headers),
            body: req_body,
        },
        CapturedResponse {
            status,
            headers: sanitize_headers(response_headers),
            body: resp_body,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits {
            request_body_cap: 8,
            response_body_cap: 8,
            ..Limits::default()
        }
    }

    #[test]
    fn excludes_dev_server_and_extensions() {
        assert!(is_excluded_url("http://localhost:7890/ping", None));
        assert!(is_excluded_url("chrome-extension://abc/page.html", None));
        assert!(!is_excluded_url("https://api.example.com/v1/users", None));
        assert!(is_excluded_url("https://my.app:4000/health", Some("my.app:4000")));
    }

    #[test]
    fn sanitizes_sensitive_headers() {
        let headers = vec![
            ("Authorization".to_string(), "Bearer xyz".to_string()),
            ("X-Custom".to_string(), "ok".to_string()),
        ];
        let out = sanitize_headers(&headers);
        assert_eq!(out.len(), 1);
        assert!(!out.iter().any(|(k, _)| k == "Authorization"));
        assert_eq!(out[0], ("X-Custom".to_string(), "ok".to_string()));
    }

    #[test]
    fn auth_endpoint_redacts_both_bodies_wholesale() {
        let (req, resp) = capture_exchange(
            "https://api.example.com/auth/login",
            "POST",
            &[],
            Some(&RawBody::Text("{\"password\":\"hunter2\"}".to_string())),
            200,
            &[],
            Some(&RawBody::Text("{\"token\":\"abc\"}".to_string())),
            &limits(),
        );
        assert_eq!(req.body.unwrap().body, AUTH_REDACTED);
        assert_eq!(resp.body.unwrap().body, AUTH_REDACTED);
    }

    #[test]
    fn binary_content_type_replaces_body() {
        let headers = vec![("Content-Type".to_string(), "image/png".to_string())];
        let (_, resp) = capture_exchange(
            "https://cdn.example.com/img.png",
            "GET",
            &[],
            None,
            200,
            &headers,
            Some(&RawBody::Text("\u{FFFD}\u{FFFD}".to_string())),
            &limits(),
        );
        assert!(resp.body.unwrap().body.starts_with("[Binary:"));
    }

    #[test]
    fn non_binary_body_is_truncated_over_cap() {
        let (req, _) = capture_exchange(
            "https://api.example.com/v1/widgets",
            "POST",
            &[],
            Some(&RawBody::Text("0123456789".to_string())),
            201,
            &[],
            None,
            &limits(),
        );
        let body = req.body.unwrap();
        assert!(body.truncated);
        assert_eq!(body.body, "01234567");
    }

    #[test]
    fn body_read_timeout_yields_placeholder() {
        let (req, _) = capture_exchange(
            "https://api.example.com/v1/widgets",
            "POST",
            &[],
            Some(&RawBody::TimedOut),
            201,
            &[],
            None,
            &limits(),
        );
        assert_eq!(req.body.unwrap().body, BODY_READ_TIMEOUT_PLACEHOLDER);
    }
}
