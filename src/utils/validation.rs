use crate::utils::error::{IfscError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(IfscError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(IfscError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(IfscError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(IfscError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(IfscError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(IfscError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    match std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(extension) if allowed_set.contains(extension.to_ascii_lowercase().as_str()) => Ok(()),
        Some(extension) => Err(IfscError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        }),
        None => Err(IfscError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IfscError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    // NaN 與任何值比較都是 false，所以要寫成「在範圍內」再取反
    let in_range = value >= min && value <= max;
    if !in_range {
        return Err(IfscError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("telegram.api_base_url", "https://api.telegram.org").is_ok());
        assert!(validate_url("telegram.api_base_url", "http://127.0.0.1:8081").is_ok());
        assert!(validate_url("telegram.api_base_url", "").is_err());
        assert!(validate_url("telegram.api_base_url", "invalid-url").is_err());
        assert!(validate_url("telegram.api_base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("conversation.timeout_seconds", 60, 1).is_ok());
        assert!(validate_positive_number("conversation.timeout_seconds", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension("dataset.path", "ifsc.csv", &["csv"]).is_ok());
        assert!(validate_file_extension("dataset.path", "data/IFSC.CSV", &["csv"]).is_ok());
        assert!(validate_file_extension("dataset.path", "ifsc.xlsx", &["csv"]).is_err());
        assert!(validate_file_extension("dataset.path", "ifsc", &["csv"]).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("conversation.match_threshold", 60.0, 0.0, 100.0).is_ok());
        assert!(validate_range("conversation.match_threshold", 0.0, 0.0, 100.0).is_ok());
        assert!(validate_range("conversation.match_threshold", 120.0, 0.0, 100.0).is_err());
        assert!(validate_range("telegram.poll_timeout_seconds", 51u64, 0, 50).is_err());
    }

    #[test]
    fn test_validate_range_rejects_nan() {
        let err = validate_range("conversation.match_threshold", f64::NAN, 0.0, 100.0).unwrap_err();
        assert!(matches!(err, IfscError::InvalidConfigValueError { .. }));
        assert!(validate_range("conversation.match_threshold", f64::INFINITY, 0.0, 100.0).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("telegram.token", "123:ABC").is_ok());
        assert!(validate_non_empty_string("telegram.token", "   ").is_err());
    }
}
