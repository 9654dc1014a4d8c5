use thiserror::Error;
use url::Url;

/// Errors raised while validating URLs that leave the process.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP pointed at a non-loopback host.
    #[error("Insecure base URL: HTTPS required (except localhost)")]
    InsecureScheme,
}

/// Validate the category API base URL.
///
/// SEC-002: the bearer token travels with every request, so plain HTTP is
/// only accepted for `localhost` / `127.0.0.1` / `[::1]` (local backends and
/// test servers). A trailing slash is removed so paths can be appended.
///
/// ```
/// use taxon::util::validate_base_url;
///
/// assert!(validate_base_url("https://api.example.com/v1").is_ok());
/// assert!(validate_base_url("http://localhost:8080/api").is_ok());
/// assert!(validate_base_url("http://api.example.com").is_err());
/// ```
pub fn validate_base_url(base: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(base.trim_end_matches('/'))?;

    match url.scheme() {
        "https" => Ok(url),
        "http" => {
            let loopback = matches!(
                url.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("[::1]")
            );
            if loopback {
                tracing::warn!(base_url = %url, "Using non-HTTPS API base URL (localhost only)");
                Ok(url)
            } else {
                Err(UrlValidationError::InsecureScheme)
            }
        }
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// Validate a picture URI before handing it to the system browser.
///
/// SEC: `open::that` delegates to the OS launcher, so anything other than
/// http/https (`file:`, `javascript:`, custom handlers) is refused.
pub fn validate_url_for_open(raw: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_base_url_accepted() {
        let url = validate_base_url("https://api.example.com/v1/").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1");
    }

    #[test]
    fn test_localhost_http_accepted() {
        assert!(validate_base_url("http://localhost:8080/api").is_ok());
        assert!(validate_base_url("http://127.0.0.1:3000").is_ok());
    }

    #[test]
    fn test_remote_http_rejected() {
        assert!(matches!(
            validate_base_url("http://evil.example.com"),
            Err(UrlValidationError::InsecureScheme)
        ));
    }

    #[test]
    fn test_other_schemes_rejected() {
        assert!(matches!(
            validate_base_url("ftp://example.com"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn test_open_accepts_web_urls_only() {
        assert!(validate_url_for_open("https://cdn.example.com/pic.png").is_ok());
        assert!(validate_url_for_open("http://cdn.example.com/pic.png").is_ok());
        assert!(validate_url_for_open("file:///etc/passwd").is_err());
        assert!(validate_url_for_open("javascript:alert(1)").is_err());
    }
}
