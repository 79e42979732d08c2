//! Response validators and the stock predicates used by the token client.

// std
use std::borrow::Cow;
// self
use crate::{_prelude::*, http::HttpResponse};

type Check = dyn Fn(&HttpResponse) -> bool + Send + Sync;

/// Named predicate that accepts or rejects a response before its body is trusted.
#[derive(Clone)]
pub struct ResponseValidator {
	name: Cow<'static, str>,
	check: Arc<Check>,
}
impl ResponseValidator {
	/// Wraps `check` under a label used in logs when it rejects a response.
	pub fn new<F>(name: impl Into<Cow<'static, str>>, check: F) -> Self
	where
		F: 'static + Fn(&HttpResponse) -> bool + Send + Sync,
	{
		Self { name: name.into(), check: Arc::new(check) }
	}

	/// Label shown in logs.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Runs the predicate.
	pub fn check(&self, response: &HttpResponse) -> bool {
		(self.check)(response)
	}
}
impl Debug for ResponseValidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ResponseValidator").field(&self.name).finish()
	}
}

/// Accepts only HTTP 200. Always evaluated first by the executor.
pub fn status_ok() -> ResponseValidator {
	ResponseValidator::new("status_200", |response| response.status == 200)
}

/// Accepts responses whose JSON body is an object containing `key`.
pub fn has_key(key: &'static str) -> ResponseValidator {
	ResponseValidator::new(format!("has_key({key})"), move |response| {
		response.json().and_then(Value::as_object).is_some_and(|body| body.contains_key(key))
	})
}

/// Accepts token responses carrying `access_token`.
pub fn has_access_token() -> ResponseValidator {
	has_key("access_token")
}

/// Accepts introspection responses carrying `expires_in`.
pub fn has_expires_in() -> ResponseValidator {
	has_key("expires_in")
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderMap;
	// self
	use super::*;

	fn response(status: u16, body: &str) -> HttpResponse {
		HttpResponse::new(status, HeaderMap::new(), body.as_bytes().to_vec())
	}

	#[test]
	fn status_ok_only_accepts_200() {
		assert!(status_ok().check(&response(200, "")));
		assert!(!status_ok().check(&response(201, "")));
		assert!(!status_ok().check(&response(500, "")));
	}

	#[test]
	fn has_key_requires_json_object_with_key() {
		assert!(has_access_token().check(&response(200, "{\"access_token\":\"a\"}")));
		assert!(!has_access_token().check(&response(200, "{\"expires_in\":5}")));
		assert!(!has_expires_in().check(&response(200, "[\"expires_in\"]")));
		assert!(!has_expires_in().check(&response(200, "garbage")));
		assert_eq!(has_expires_in().name(), "has_key(expires_in)");
	}
}
