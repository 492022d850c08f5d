use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    Invalid(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to anything but localhost would leak the bearer token.
    #[error("Insecure API URL: HTTPS required (except localhost): {0}")]
    Insecure(String),
}

/// Parse and check an API base URL.
///
/// HTTPS is required; plain HTTP is accepted only for `localhost` and
/// `127.0.0.1` so tests can point at a local mock server.
///
/// ```
/// use notifeed::util::validate_api_base;
///
/// assert!(validate_api_base("https://talk.zooniverse.org").is_ok());
/// assert!(validate_api_base("http://127.0.0.1:8080").is_ok());
/// assert!(validate_api_base("http://talk.zooniverse.org").is_err());
/// assert!(validate_api_base("ftp://talk.zooniverse.org").is_err());
/// ```
pub fn validate_api_base(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => {}
        "http" => {
            let is_localhost = matches!(url.host_str(), Some("localhost" | "127.0.0.1"));
            if !is_localhost {
                return Err(UrlError::Insecure(url_str.to_owned()));
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS API base URL (localhost only)");
        }
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_owned())),
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_accepted() {
        let url = validate_api_base("https://www.zooniverse.org/api").unwrap();
        assert_eq!(url.path(), "/api");
    }

    #[test]
    fn test_localhost_http_accepted() {
        assert!(validate_api_base("http://localhost:3000").is_ok());
        assert!(validate_api_base("http://127.0.0.1:3000").is_ok());
    }

    #[test]
    fn test_remote_http_rejected() {
        assert!(matches!(
            validate_api_base("http://talk.zooniverse.org"),
            Err(UrlError::Insecure(_))
        ));
    }

    #[test]
    fn test_other_schemes_rejected() {
        assert!(matches!(
            validate_api_base("file:///etc/passwd"),
            Err(UrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_api_base("not a url"),
            Err(UrlError::Invalid(_))
        ));
    }
}
