//! Store name and key validation.
//!
//! Both checks run before a request is built, so a malformed name or key
//! never reaches the network.

/// Maximum store name length in UTF-8 bytes.
pub const MAX_STORE_NAME_BYTES: usize = 64;

/// Maximum key length in UTF-8 bytes.
pub const MAX_KEY_BYTES: usize = 600;

/// Prefix reserved for deploy-scoped stores.
pub const DEPLOY_STORE_PREFIX: &str = "deploy:";

const ENCODED_SLASH: &str = "%2F";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Store name must not be empty.")]
    EmptyStoreName,
    #[error("Store name must not contain forward slashes (/).")]
    StoreNameContainsSlash,
    #[error("Store name must be a sequence of Unicode characters whose UTF-8 encoding is at most {MAX_STORE_NAME_BYTES} bytes long.")]
    StoreNameTooLong,
    #[error("Store name must not start with the `{DEPLOY_STORE_PREFIX}` reserved keyword.")]
    ReservedStoreName,
    #[error("Blob key must not be empty.")]
    EmptyKey,
    #[error("Blob key must not start with forward slash (/).")]
    KeyStartsWithSlash,
    #[error("Blob key must be a sequence of Unicode characters whose UTF-8 encoding is at most {MAX_KEY_BYTES} bytes long.")]
    KeyTooLong,
    #[error("Blob key must not contain `.` or `..` path segments.")]
    KeyDotSegment,
}

/// Validate a store name as it appears on the wire.
///
/// Deploy-scoped names (`deploy:<id>`) pass here; the reserved prefix is
/// only rejected for user-chosen names, see [`validate_user_store_name`].
pub fn validate_store_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyStoreName);
    }

    if name.contains('/') || contains_encoded_slash(name) {
        return Err(ValidationError::StoreNameContainsSlash);
    }

    if name.len() > MAX_STORE_NAME_BYTES {
        return Err(ValidationError::StoreNameTooLong);
    }

    Ok(())
}

/// Validate a store name chosen by the caller for a regular (site) store.
pub fn validate_user_store_name(name: &str) -> Result<(), ValidationError> {
    if name.starts_with(DEPLOY_STORE_PREFIX) {
        return Err(ValidationError::ReservedStoreName);
    }
    validate_store_name(name)
}

/// Validate a blob key.
pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::EmptyKey);
    }

    if key.starts_with('/') || starts_with_encoded_slash(key) {
        return Err(ValidationError::KeyStartsWithSlash);
    }

    // str::len is the UTF-8 byte length
    if key.len() > MAX_KEY_BYTES {
        return Err(ValidationError::KeyTooLong);
    }

    // URL normalisation would collapse these segments onto another path
    if key.split('/').any(|segment| matches!(segment, "." | "..")) {
        return Err(ValidationError::KeyDotSegment);
    }

    Ok(())
}

fn contains_encoded_slash(s: &str) -> bool {
    s.to_ascii_uppercase().contains(ENCODED_SLASH)
}

fn starts_with_encoded_slash(s: &str) -> bool {
    s.get(..ENCODED_SLASH.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(ENCODED_SLASH))
}
