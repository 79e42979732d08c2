//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	env,
	net::TcpListener,
	path::PathBuf,
	process,
	time::{SystemTime, UNIX_EPOCH},
};
// self
use oauth2_token_keeper::{
	http::{ReqwestHttpClient, RetryExecutor},
	reqwest::Client,
	url::Url,
};

/// Returns a fresh directory path under the system temp dir (not created).
pub fn temp_dir(label: &str) -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock should be after the Unix epoch.")
		.as_nanos();

	env::temp_dir().join(format!("oauth2_token_keeper_it_{label}_{}_{nanos}", process::id()))
}

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Executor over [`test_reqwest_http_client`].
pub fn test_executor() -> RetryExecutor {
	RetryExecutor::new(test_reqwest_http_client())
}

/// Parses a mock server URL.
pub fn parse_url(raw: &str) -> Url {
	Url::parse(raw).expect("Mock server URL should parse successfully.")
}

/// Returns a URL on a local port with nothing listening.
pub fn closed_port_url() -> Url {
	let listener = TcpListener::bind("127.0.0.1:0").expect("Placeholder listener should bind.");
	let addr = listener.local_addr().expect("Placeholder listener should expose its address.");

	drop(listener);

	Url::parse(&format!("http://{addr}/nothing")).expect("Closed-port URL should parse.")
}
