//! Instance registration validation rules.

use crate::error::CoreError;

/// Maximum length of an instance display name.
const MAX_NAME_LEN: usize = 255;

/// Maximum length of an instance base URL.
const MAX_URL_LEN: usize = 500;

/// Validate an instance display name.
pub fn validate_instance_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Instance name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Instance name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Normalize and validate a ServiceNow base URL.
///
/// Trims whitespace, prefixes `https://` when no scheme is given, and
/// requires a `service-now.com` host.
pub fn normalize_instance_url(url: &str) -> Result<String, CoreError> {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return Err(CoreError::Validation(
            "Instance URL must not be empty".to_string(),
        ));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        url = format!("https://{url}");
    }
    if url.len() > MAX_URL_LEN {
        return Err(CoreError::Validation(format!(
            "Instance URL must not exceed {MAX_URL_LEN} characters"
        )));
    }
    if !url.contains("service-now.com") {
        return Err(CoreError::Validation(
            "URL must be a ServiceNow domain".to_string(),
        ));
    }
    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_gets_https_prefix() {
        let url = normalize_instance_url("acme.service-now.com").unwrap();
        assert_eq!(url, "https://acme.service-now.com");
    }

    #[test]
    fn test_url_trailing_slash_stripped() {
        let url = normalize_instance_url("https://acme.service-now.com/").unwrap();
        assert_eq!(url, "https://acme.service-now.com");
    }

    #[test]
    fn test_non_servicenow_domain_rejected() {
        assert!(normalize_instance_url("https://example.com").is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(validate_instance_name("  ").is_err());
    }

    #[test]
    fn test_overlong_name_rejected() {
        assert!(validate_instance_name(&"x".repeat(256)).is_err());
    }
}
