use crate::utils::error::{PagesError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> PagesError {
    PagesError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(invalid(
            field_name,
            value,
            format!("Allowed values: {}", allowed.join(", ")),
        ));
    }
    Ok(())
}

/// Git ref names may not contain whitespace, `..`, `~^:?*[\` or start with `-`.
pub fn validate_branch_name(field_name: &str, branch: &str) -> Result<()> {
    validate_non_empty_string(field_name, branch)?;

    let forbidden = [' ', '\t', '~', '^', ':', '?', '*', '[', '\\'];
    if branch.starts_with('-')
        || branch.starts_with('/')
        || branch.ends_with('/')
        || branch.ends_with(".lock")
        || branch.contains("..")
        || branch.contains("@{")
        || branch.chars().any(|c| forbidden.contains(&c) || c.is_control())
    {
        return Err(invalid(field_name, branch, "Not a valid git branch name"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("source.endpoint", "https://newsapi.org/v2/everything").is_ok());
        assert!(validate_url("source.endpoint", "http://localhost:8080").is_ok());
        assert!(validate_url("source.endpoint", "").is_err());
        assert!(validate_url("source.endpoint", "invalid-url").is_err());
        assert!(validate_url("source.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("source.page_size", 20, 1, 100).is_ok());
        assert!(validate_range("source.page_size", 0, 1, 100).is_err());
        assert!(validate_range("source.page_size", 101, 1, 100).is_err());
    }

    #[test]
    fn test_validate_one_of() {
        assert!(validate_one_of("source.sort_by", "publishedAt", &["publishedAt", "relevancy"]).is_ok());
        assert!(validate_one_of("source.sort_by", "newest", &["publishedAt", "relevancy"]).is_err());
    }

    #[test]
    fn test_validate_branch_name() {
        assert!(validate_branch_name("publish.branch", "gh-pages").is_ok());
        assert!(validate_branch_name("publish.branch", "deploy/site").is_ok());
        assert!(validate_branch_name("publish.branch", "").is_err());
        assert!(validate_branch_name("publish.branch", "-evil").is_err());
        assert!(validate_branch_name("publish.branch", "a..b").is_err());
        assert!(validate_branch_name("publish.branch", "with space").is_err());
    }
}
