use serde::de::DeserializeOwned;

use crate::error::ApertureError;

/// Removes the `while (1) {}` anti-hijacking prefix Lightroom puts in front of JSON bodies.
///
/// Whitespace anywhere inside the prefix is tolerated. Bodies without the prefix are returned
/// unchanged.
pub fn strip_json_guard(body: &str) -> &str {
    let Some(mut rest) = body.trim_start().strip_prefix("while") else {
        return body;
    };
    for expected in ['(', '1', ')', '{', '}'] {
        match rest.trim_start().strip_prefix(expected) {
            Some(after) => rest = after,
            None => return body,
        }
    }
    rest.trim_start()
}

pub fn parse_guarded_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApertureError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ApertureError::UpstreamPayload(format!("body is not valid UTF-8: {e}")))?;
    Ok(serde_json::from_str(strip_json_guard(text))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn strips_prefix_variants() {
        for body in [
            r#"while (1) {}{"id":"abc"}"#,
            r#"while(1){}{"id":"abc"}"#,
            "while ( 1 ) { }\n{\"id\":\"abc\"}",
            "  while (1) {}\r\n  {\"id\":\"abc\"}",
        ] {
            let v: Value = parse_guarded_json(body.as_bytes()).unwrap();
            assert_eq!(v["id"], "abc", "{body}");
        }
    }

    #[test]
    fn unprefixed_bodies_pass_through() {
        let body = r#"{"id":"abc"}"#;
        assert_eq!(strip_json_guard(body), body);
        let v: Value = parse_guarded_json(body.as_bytes()).unwrap();
        assert_eq!(v["id"], "abc");
    }

    #[test]
    fn partial_prefix_is_left_alone() {
        let body = r#"while (2) {}{"id":"abc"}"#;
        assert_eq!(strip_json_guard(body), body);
        assert!(parse_guarded_json::<Value>(body.as_bytes()).is_err());
    }
}
