//! Input validation for instance registration.
//!
//! Pure functions used by both the registry and the HTTP layer.

use crate::error::CoreError;

/// Maximum length of an instance URL.
const MAX_URL_LEN: usize = 2048;

/// Validate an instance base URL.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_URL_LEN` characters.
/// - Must start with `http://` or `https://`.
/// - Must not end with a trailing slash (paths are appended verbatim).
pub fn validate_instance_url(url: &str) -> Result<(), CoreError> {
    if url.is_empty() {
        return Err(CoreError::Validation(
            "Instance url must not be empty".to_string(),
        ));
    }
    if url.len() > MAX_URL_LEN {
        return Err(CoreError::Validation(format!(
            "Instance url must not exceed {MAX_URL_LEN} characters"
        )));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(CoreError::Validation(
            "Instance url must start with http:// or https://".to_string(),
        ));
    }
    if url.ends_with('/') {
        return Err(CoreError::Validation(
            "Instance url must not end with a trailing slash".to_string(),
        ));
    }
    Ok(())
}
