use gasoline_config::Limits;

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedPayload {
    pub body: String,
    pub truncated: bool,
}

/// What the host handed us off a `message` event or a `send()` call.
pub enum RawPayload<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

/// Formats a WebSocket payload for transport (spec.md §4.10). Strings are
/// truncated at the WS body cap; binary payloads never attempt a text
/// decode, only a size/magic-bytes summary.
pub fn format_payload(raw: &RawPayload, limits: &Limits) -> FormattedPayload {
    match raw {
        RawPayload::Text(s) => {
            if s.len() <= limits.ws_max_body_bytes {
                FormattedPayload {
                    body: s.to_string(),
                    truncated: false,
                }
            } else {
                let mut end = limits.ws_max_body_bytes;
                while end > 0 && !s.is_char_boundary(end) {
                    end -= 1;
                }
                FormattedPayload {
                    body: s[..end].to_string(),
                    truncated: true,
                }
            }
        }
        RawPayload::Binary(bytes) => {
            let body = if bytes.len() < 256 {
                format!("[Binary: {}B] {}", bytes.len(), hex(bytes))
            } else {
                format!("[Binary: {}B, magic:{}]", bytes.len(), hex(&bytes[..bytes.len().min(4)]))
            };
            FormattedPayload {
                body,
                truncated: false,
            }
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A host-reported Blob payload carries no accessible bytes synchronously;
/// we only know its size.
pub fn format_blob(size: usize) -> FormattedPayload {
    FormattedPayload {
        body: format!("[Binary: {}B]", size),
        truncated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits {
            ws_max_body_bytes: 4,
            ..Limits::default()
        }
    }

    #[test]
    fn text_passthrough_and_truncation() {
        let short = format_payload(&RawPayload::Text("hi"), &limits());
        assert_eq!(short.body, "hi");
        assert!(!short.truncated);

        let long = format_payload(&RawPayload::Text("hello world"), &limits());
        assert!(long.truncated);
        assert_eq!(long.body, "hell");
    }

    #[test]
    fn small_binary_gets_full_hex() {
        let out = format_payload(&RawPayload::Binary(&[0xde, 0xad, 0xbe, 0xef]), &limits());
        assert_eq!(out.body, "[Binary: 4B] deadbeef");
    }

    #[test]
    fn large_binary_gets_magic_bytes_only() {
        let bytes = vec![0xAB; 300];
        let out = format_payload(&RawPayload::Binary(&bytes), &limits());
        assert_eq!(out.body, "[Binary: 300B, magic:abababab]");
    }

    #[test]
    fn blob_reports_size_only() {
        assert_eq!(format_blob(1024).body, "[Binary: 1024B]");
    }
}
