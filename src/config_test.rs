use super::*;

// =============================================================================
// normalize_api_url
// =============================================================================

#[test]
fn api_url_trailing_slash_trimmed() {
    assert_eq!(normalize_api_url("http://localhost:8000/").unwrap(), "http://localhost:8000");
    assert_eq!(normalize_api_url("https://api.example.com///").unwrap(), "https://api.example.com");
}

#[test]
fn api_url_whitespace_trimmed() {
    assert_eq!(normalize_api_url("  http://localhost:8000  ").unwrap(), "http://localhost:8000");
}

#[test]
fn api_url_requires_http_scheme() {
    let err = normalize_api_url("localhost:8000").unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));
    assert!(err.to_string().contains("localhost:8000"));
}

#[test]
fn api_url_keeps_path_prefix() {
    assert_eq!(normalize_api_url("https://example.com/api/").unwrap(), "https://example.com/api");
}

// =============================================================================
// default_token_path
// =============================================================================

#[test]
fn token_path_under_home() {
    let path = default_token_path(Some(PathBuf::from("/home/student")));
    assert_eq!(path, PathBuf::from("/home/student/.campus/token"));
}

#[test]
fn token_path_relative_without_home() {
    assert_eq!(default_token_path(None), PathBuf::from(".campus/token"));
}

// =============================================================================
// with_api_url
// =============================================================================

#[test]
fn with_api_url_overrides_and_validates() {
    let config = ClientConfig { api_url: DEFAULT_API_URL.into(), token_path: PathBuf::from("t") };
    let config = config.with_api_url("https://campus.example/").unwrap();
    assert_eq!(config.api_url, "https://campus.example");

    let err = config.with_api_url("ftp://nope").unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));
}

// =============================================================================
// default_token_file
// =============================================================================

#[test]
fn default_token_file_is_absolute_under_platform_home() {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let path = default_token_file();
    assert!(path.is_absolute(), "{}", path.display());
    assert!(path.starts_with(&home));
    assert!(path.ends_with(".campus/token"));
}
