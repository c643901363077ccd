use crate::error::ApertureError;

pub const MAX_GALLERY_ID_LEN: usize = 128;

/// Non-empty run of ASCII alphanumerics, `-` and `_`.
pub fn is_path_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Gallery ids are path-safe: `^[A-Za-z0-9_-]+$`, at most 128 bytes.
pub fn validate_gallery_id(id: &str) -> Result<(), ApertureError> {
    if id.len() <= MAX_GALLERY_ID_LEN && is_path_segment(id) {
        Ok(())
    } else {
        Err(ApertureError::InvalidGalleryId)
    }
}
