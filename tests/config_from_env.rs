//! Builder configuration sourced from the environment.
//!
//! Kept in its own test binary because it mutates process environment.

use sitework_api::{ClientBuilder, ErrorKind, BASE_URL_ENV, DEFAULT_TIMEOUT, TIMEOUT_ENV};
use std::time::Duration;

#[test]
fn test_from_env() {
    std::env::remove_var(BASE_URL_ENV);
    std::env::remove_var(TIMEOUT_ENV);
    let err = ClientBuilder::from_env().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    std::env::set_var(BASE_URL_ENV, "https://api.example.com");
    let client = ClientBuilder::from_env().unwrap().build().unwrap();
    assert_eq!(client.base_url(), "https://api.example.com");
    assert_eq!(client.timeout(), DEFAULT_TIMEOUT);

    std::env::set_var(TIMEOUT_ENV, "1500");
    let client = ClientBuilder::from_env().unwrap().build().unwrap();
    assert_eq!(client.timeout(), Duration::from_millis(1500));

    std::env::set_var(TIMEOUT_ENV, "soon");
    let err = ClientBuilder::from_env().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.message().contains(TIMEOUT_ENV));

    std::env::remove_var(BASE_URL_ENV);
    std::env::remove_var(TIMEOUT_ENV);
}
