//! Plain-text extraction from Gmail message payloads.
//!
//! Bodies arrive base64url-encoded inside an arbitrarily nested MIME part
//! tree. Extraction is best-effort: a message with no decodable text/plain
//! part yields an empty string, never an error.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::gmail::types::{Message, MessagePart};

/// Decode a base64url string (padding optional) into UTF-8 text.
///
/// Gmail strips padding and uses the URL-safe alphabet; we substitute back
/// to the standard alphabet and re-pad before decoding. Undecodable input
/// degrades to an empty string.
pub fn decode_base64url(data: &str) -> String {
    let mut normalized = data.replace('-', "+").replace('_', "/");
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }

    match STANDARD.decode(normalized.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

/// Pull the first plain-text body out of a message.
///
/// Depth-first over the part tree: the first part declaring `text/plain`
/// with body data wins. Single-part messages carry the data directly on the
/// payload.
pub fn extract_plain_text(msg: &Message) -> String {
    let payload = match &msg.payload {
        Some(p) => p,
        None => return String::new(),
    };

    if let Some(text) = find_plain_text_part(payload) {
        return text;
    }

    // Single-part message: the payload itself carries the body.
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        return decode_base64url(data);
    }

    String::new()
}

fn find_plain_text_part(part: &MessagePart) -> Option<String> {
    if part.mime_type.as_deref() == Some("text/plain") {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            return Some(decode_base64url(data));
        }
    }

    for child in part.parts.as_deref().unwrap_or_default() {
        if let Some(text) = find_plain_text_part(child) {
            return Some(text);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{MessageBody, MessagePart};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn encode(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text.as_bytes())
    }

    fn part(mime_type: &str, data: Option<&str>, children: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: Some(mime_type.to_string()),
            body: data.map(|d| MessageBody {
                data: Some(encode(d)),
                size: Some(d.len() as u64),
            }),
            parts: if children.is_empty() {
                None
            } else {
                Some(children)
            },
        }
    }

    fn message(payload: MessagePart) -> Message {
        Message {
            id: "m-1".into(),
            internal_date: Some("1700000000000".into()),
            snippet: None,
            payload: Some(payload),
        }
    }

    #[test]
    fn test_base64url_round_trip_ascii() {
        let text = "Your OTP is 482913";
        assert_eq!(decode_base64url(&encode(text)), text);
    }

    #[test]
    fn test_base64url_round_trip_emoji() {
        let text = "code: 7731 🎉🔐";
        assert_eq!(decode_base64url(&encode(text)), text);
    }

    #[test]
    fn test_base64url_round_trip_vietnamese() {
        let text = "Mã xác minh của bạn là 482913";
        assert_eq!(decode_base64url(&encode(text)), text);
    }

    #[test]
    fn test_base64url_round_trip_japanese() {
        let text = "確認コードは482913です";
        assert_eq!(decode_base64url(&encode(text)), text);
    }

    #[test]
    fn test_garbage_input_decodes_to_empty() {
        assert_eq!(decode_base64url("!!!not base64!!!"), "");
    }

    #[test]
    fn test_single_part_body() {
        let msg = message(part("text/plain", Some("OTP: 123456"), vec![]));
        assert_eq!(extract_plain_text(&msg), "OTP: 123456");
    }

    #[test]
    fn test_multipart_prefers_plain_text_over_html() {
        let msg = message(part(
            "multipart/alternative",
            None,
            vec![
                part("text/html", Some("<b>OTP: 999999</b>"), vec![]),
                part("text/plain", Some("OTP: 123456"), vec![]),
            ],
        ));
        assert_eq!(extract_plain_text(&msg), "OTP: 123456");
    }

    #[test]
    fn test_deeply_nested_multipart() {
        let msg = message(part(
            "multipart/mixed",
            None,
            vec![part(
                "multipart/alternative",
                None,
                vec![part(
                    "multipart/related",
                    None,
                    vec![part("text/plain", Some("verification code: 7731"), vec![])],
                )],
            )],
        ));
        assert_eq!(extract_plain_text(&msg), "verification code: 7731");
    }

    #[test]
    fn test_no_payload_yields_empty() {
        let msg = Message {
            id: "m-1".into(),
            internal_date: None,
            snippet: None,
            payload: None,
        };
        assert_eq!(extract_plain_text(&msg), "");
    }

    #[test]
    fn test_html_only_message_yields_empty() {
        let msg = message(part(
            "multipart/alternative",
            None,
            vec![part("text/html", Some("<b>OTP: 999999</b>"), vec![])],
        ));
        assert_eq!(extract_plain_text(&msg), "");
    }
}
