use crate::analytics::{StatsError, StatsResult};

pub const MAX_PATH_LEN: usize = 500;

/// Accept `/` followed by ASCII letters, digits, `-`, `_` and `/`, at most 500 bytes
pub fn validate_path(path: &str) -> StatsResult<()> {
    if path.is_empty() {
        return Err(StatsError::Validation("Path is required".to_string()));
    }
    if path.len() > MAX_PATH_LEN || !path.starts_with('/') {
        return Err(StatsError::Validation("Invalid path format".to_string()));
    }
    let valid = path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
    if !valid {
        return Err(StatsError::Validation("Invalid path format".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        for path in ["/", "/blog", "/blog/post-1", "/a_b/C-9/"] {
            assert!(validate_path(path).is_ok(), "{path} should be valid");
        }
    }

    #[test]
    fn test_invalid_paths() {
        for path in ["", "blog", "/blog?x=1", "/post.html", "/caf\u{e9}", "/a b"] {
            assert!(validate_path(path).is_err(), "{path:?} should be rejected");
        }
    }

    #[test]
    fn test_path_length_limit() {
        let ok = format!("/{}", "a".repeat(MAX_PATH_LEN - 1));
        let too_long = format!("/{}", "a".repeat(MAX_PATH_LEN));
        assert!(validate_path(&ok).is_ok());
        assert!(validate_path(&too_long).is_err());
    }
}
