//! Retrying request executor with pluggable response validation.
//!
//! A [`RetryRequest`] describes one logical call: method, URL, headers, query and form
//! parameters, caller validators, attempt budget, per-attempt timeout, and whether exhaustion is
//! fatal. [`RetryExecutor::execute`] prepends the mandatory HTTP 200 validator, runs every
//! validator on every attempt, and returns the first accepted JSON body.

// std
use std::{collections::BTreeMap, iter};
// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, LastAttempt, TransportError},
	http::{HttpResponse, ReqwestHttpClient, ResponseValidator, validator},
	obs::{self, AttemptOutcome, Op, OpSpan, obs_event},
};

/// Default number of attempts per request.
pub const DEFAULT_RETRIES: u32 = 5;
/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One logical HTTP call plus its validation and retry policy.
#[derive(Clone, Debug)]
pub struct RetryRequest {
	/// HTTP method.
	pub method: Method,
	/// Target URL.
	pub url: Url,
	/// Request headers.
	pub headers: BTreeMap<String, String>,
	/// Query parameters in order; repeated keys are allowed.
	pub query: Vec<(String, String)>,
	/// Form body parameters in order; sent only when non-empty.
	pub form: Vec<(String, String)>,
	/// Caller validators, evaluated after the built-in HTTP 200 check.
	pub validators: Vec<ResponseValidator>,
	/// Attempt budget; must be at least one.
	pub retries: u32,
	/// Per-attempt timeout.
	pub timeout: Duration,
	/// Whether exhaustion surfaces as [`Error::RetriesExhausted`] instead of `Ok(None)`.
	pub critical: bool,
	/// Operation label for spans and metrics.
	pub op: Op,
}
impl RetryRequest {
	/// Starts a request with the default policy: 5 attempts, 10 s timeout, non-critical.
	pub fn new(method: Method, url: Url) -> Self {
		Self {
			method,
			url,
			headers: BTreeMap::new(),
			query: Vec::new(),
			form: Vec::new(),
			validators: Vec::new(),
			retries: DEFAULT_RETRIES,
			timeout: DEFAULT_TIMEOUT,
			critical: false,
			op: Op::Request,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Sets or replaces a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Appends a form body parameter.
	pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.form.push((key.into(), value.into()));

		self
	}

	/// Appends a caller validator.
	pub fn validator(mut self, validator: ResponseValidator) -> Self {
		self.validators.push(validator);

		self
	}

	/// Overrides the attempt budget.
	pub fn retries(mut self, retries: u32) -> Self {
		self.retries = retries;

		self
	}

	/// Overrides the per-attempt timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Marks exhaustion as fatal.
	pub fn critical(mut self, critical: bool) -> Self {
		self.critical = critical;

		self
	}

	/// Tags the request for spans and metrics.
	pub fn op(mut self, op: Op) -> Self {
		self.op = op;

		self
	}
}

/// Executes [`RetryRequest`]s over a shared reqwest client.
#[derive(Clone, Debug, Default)]
pub struct RetryExecutor {
	http: ReqwestHttpClient,
}
impl RetryExecutor {
	/// Wraps the provided HTTP client.
	pub fn new(http: ReqwestHttpClient) -> Self {
		Self { http }
	}

	/// Runs `request` until one attempt passes every validator or the budget runs out.
	///
	/// Returns `Ok(Some(body))` for the first accepted attempt, `Ok(None)` when a non-critical
	/// request is exhausted, and [`Error::RetriesExhausted`] when a critical one is. The error
	/// carries the last rejected response if any response ever arrived, otherwise the last
	/// transport failure.
	pub async fn execute(&self, request: &RetryRequest) -> Result<Option<Value>> {
		match self.run(request).await {
			Ok(body) => Ok(Some(body)),
			Err(Error::RetriesExhausted { .. }) if !request.critical => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Like [`RetryExecutor::execute`], but exhaustion is always fatal regardless of
	/// [`RetryRequest::critical`].
	pub async fn execute_required(&self, request: &RetryRequest) -> Result<Value> {
		self.run(request).await
	}

	async fn run(&self, request: &RetryRequest) -> Result<Value> {
		if request.retries == 0 {
			return Err(ConfigError::ZeroRetries.into());
		}

		let validators = iter::once(validator::status_ok())
			.chain(request.validators.iter().cloned())
			.collect::<Vec<_>>();
		let span = OpSpan::new(request.op, "execute");

		span.instrument(async move {
			let mut last_rejected = None;
			let mut last_transport = None;

			for attempt in 1..=request.retries {
				let response = match self.send(request).await {
					Ok(response) => response,
					Err(e) => {
						obs_event!(
							warn,
							url = %request.url,
							attempt,
							error = %e,
							"Request failed; retrying."
						);
						obs::record_attempt(request.op, AttemptOutcome::Transport);

						last_transport = Some(e);

						continue;
					},
				};
				// All validators run on every attempt; no short-circuit.
				let rejected = validators
					.iter()
					.filter_map(|v| (!v.check(&response)).then(|| v.name().to_owned()))
					.collect::<Vec<_>>();

				if !rejected.is_empty() {
					obs_event!(
						warn,
						url = %request.url,
						attempt,
						status = response.status,
						rejected_by = ?rejected,
						"Response rejected; retrying."
					);
					obs::record_attempt(request.op, AttemptOutcome::Rejected);

					last_rejected = Some(LastAttempt::Rejected {
						status: response.status,
						body_preview: response.body_preview(),
					});

					continue;
				}

				match response.into_json(&request.url) {
					Ok(body) => {
						obs::record_attempt(request.op, AttemptOutcome::Accepted);

						return Ok(body);
					},
					Err(e) => {
						obs_event!(
							warn,
							url = %request.url,
							attempt,
							error = %e,
							"Accepted response is not JSON; retrying."
						);
						obs::record_attempt(request.op, AttemptOutcome::Transport);

						last_transport = Some(e);
					},
				}
			}

			obs_event!(
				error,
				url = %request.url,
				attempts = request.retries,
				critical = request.critical,
				"Failed to get a valid response."
			);

			let last = match (last_rejected, last_transport) {
				(Some(rejected), _) => rejected,
				(None, Some(transport)) => LastAttempt::Transport(transport),
				(None, None) => return Err(ConfigError::ZeroRetries.into()),
			};

			Err(Error::RetriesExhausted {
				url: request.url.clone(),
				attempts: request.retries,
				last,
			})
		})
		.await
	}

	async fn send(&self, request: &RetryRequest) -> Result<HttpResponse, TransportError> {
		let network = |e: ReqwestError| TransportError::network(request.url.clone(), e);
		let mut builder = self
			.http
			.request(request.method.clone(), request.url.clone())
			.timeout(request.timeout);

		for (name, value) in &request.headers {
			builder = builder.header(name, value);
		}
		if !request.query.is_empty() {
			builder = builder.query(&request.query);
		}
		if !request.form.is_empty() {
			builder = builder.form(&request.form);
		}

		let response = builder.send().await.map_err(network)?;
		let status = response.status().as_u16();
		let headers = response.headers().to_owned();
		let body = response.bytes().await.map_err(network)?.to_vec();

		Ok(HttpResponse::new(status, headers, body))
	}
}
