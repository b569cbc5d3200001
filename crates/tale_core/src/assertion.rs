use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Parses a signed token `header.payload.signature` and returns its payload.
///
/// Returns `None` for anything that is not three dot-separated segments with
/// a base64url JSON middle segment, or whose payload is JSON `null`.
pub fn parse_signed_assertion(token: &str) -> Option<Value> {
    let mut segments = token.trim().split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice(&decoded).ok()? {
        Value::Null => None,
        value => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn accepts_three_segment_token() {
        let payload = parse_signed_assertion(&token(r#"{"sub":"http://orcid.org/0000"}"#)).unwrap();
        assert_eq!(payload["sub"], "http://orcid.org/0000");
    }

    #[test]
    fn tolerates_padding_and_whitespace() {
        let padded = format!("{}==\n", token(r#"{"a":1}"#));
        // Padding belongs to the last segment here, so the middle stays valid.
        assert!(parse_signed_assertion(&padded).is_some());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(parse_signed_assertion("").is_none());
        assert!(parse_signed_assertion("<error>no session</error>").is_none());
        assert!(parse_signed_assertion("a.b").is_none());
        assert!(parse_signed_assertion("a.!!!.c").is_none());
        assert!(parse_signed_assertion(&format!("{}.extra", token("{}"))).is_none());
        assert!(parse_signed_assertion(&token("not json")).is_none());
        assert!(parse_signed_assertion(&token("null")).is_none());
    }
}
