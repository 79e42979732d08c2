//! HTTP primitives: the shared reqwest wrapper, buffered responses, response validators, and
//! the retrying executor built on top of them.
//!
//! Every request funnels through [`RetryExecutor::execute`]. A response is buffered into an
//! [`HttpResponse`] before validators see it, so validators can inspect the status and body as
//! many times as they like without racing the transport.

pub mod retry;
pub mod validator;

pub use retry::*;
pub use validator::ResponseValidator;

// std
use std::{ops::Deref, sync::OnceLock};
// crates.io
use reqwest::header::HeaderMap;
// self
use crate::{_prelude::*, error::TransportError};

const BODY_PREVIEW_CHARS: usize = 256;

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The wrapped client keeps its connection pool across requests; each request still gets its own
/// timeout from the [`RetryRequest`] that issued it.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Fully buffered HTTP response handed to validators.
#[derive(Debug)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
	json: OnceLock<Option<Value>>,
}
impl HttpResponse {
	/// Builds a response from its parts.
	pub fn new(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
		Self { status, headers, body, json: OnceLock::new() }
	}

	/// Returns the body parsed as JSON, or `None` if it is not valid JSON.
	///
	/// The parse happens once and is shared by every validator of the attempt.
	pub fn json(&self) -> Option<&Value> {
		self.json.get_or_init(|| serde_json::from_slice(&self.body).ok()).as_ref()
	}

	/// Leading part of the body as lossy UTF-8, for logs and error payloads.
	pub fn body_preview(&self) -> String {
		String::from_utf8_lossy(&self.body).chars().take(BODY_PREVIEW_CHARS).collect()
	}

	pub(crate) fn into_json(self, url: &Url) -> Result<Value, TransportError> {
		match self.json.into_inner() {
			Some(Some(value)) => Ok(value),
			_ => serde_json::from_slice(&self.body)
				.map_err(|source| TransportError::MalformedBody { url: url.clone(), source }),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_is_cached_and_preview_is_bounded() {
		let response =
			HttpResponse::new(200, HeaderMap::new(), b"{\"access_token\":\"abc\"}".to_vec());

		assert_eq!(response.json().and_then(|v| v.get("access_token")), Some(&Value::from("abc")));
		assert!(response.json().is_some());

		let long = HttpResponse::new(500, HeaderMap::new(), vec![b'x'; 1024]);

		assert!(long.json().is_none());
		assert_eq!(long.body_preview().len(), BODY_PREVIEW_CHARS);
	}

	#[test]
	fn into_json_reports_malformed_bodies() {
		let url = Url::parse("https://api.example.com/streams")
			.expect("Fixture URL should parse successfully.");
		let err = HttpResponse::new(200, HeaderMap::new(), b"not json".to_vec())
			.into_json(&url)
			.expect_err("Non-JSON bodies should be rejected.");

		assert!(matches!(err, TransportError::MalformedBody { .. }));
	}
}
