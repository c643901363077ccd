use serde::Serialize;

/// Upstream bodies quoted in logs are cut to this many characters.
pub const BODY_PREVIEW_CHARS: usize = 300;

/// Runs `log_action` with a pretty JSON rendering of `value`, only when DEBUG is enabled.
pub(crate) fn debug_pretty_json<T, F>(value: &T, log_action: F)
where
    T: Serialize + ?Sized,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(pretty.as_str());
}

/// Lossy, length-bounded view of an upstream body for log lines.
pub(crate) fn body_preview(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    match raw.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...<truncated>", &raw[..idx]),
        None => raw.into_owned(),
    }
}
