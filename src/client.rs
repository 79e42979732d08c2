//! Client facade wiring OAuth issuance and introspection into the lifecycle manager, plus
//! authorized downstream lookups.
//!
//! [`TokenClient::setup`] is the composition root: it loads (or creates) the key, opens the
//! encrypted store, loads the stored token into a [`TokenManager`], runs one validation pass, and
//! starts the periodic checks. Handlers that need a token hold the client (or its manager) by
//! reference; there is no process-wide token state.

// crates.io
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{AuthorityFuture, TokenAuthority, TokenSecret, TokenValidation},
	config::{ClientConfig, Endpoints, RetryPolicy},
	crypto::KeyStore,
	error::{ConfigError, InputError},
	http::{ReqwestHttpClient, RetryExecutor, RetryRequest, validator},
	manager::TokenManager,
	obs::{Op, OpSpan},
	store::{EncryptedFileStore, SecretStore},
};

/// Maximum identifiers accepted by one live-status lookup.
pub const MAX_LOOKUP_IDS: usize = 100;

/// OAuth client-credentials authority backed by the retrying executor.
///
/// Both calls go through [`RetryExecutor::execute_required`], so exhaustion always surfaces as
/// [`Error::RetriesExhausted`].
#[derive(Clone, Debug)]
pub struct OAuthAuthority {
	executor: RetryExecutor,
	client_id: ClientId,
	client_secret: ClientSecret,
	endpoints: Endpoints,
	retry: RetryPolicy,
}
impl OAuthAuthority {
	/// Builds an authority from the config's credentials, endpoints, and retry policy.
	pub fn new(executor: RetryExecutor, config: &ClientConfig) -> Self {
		Self {
			executor,
			client_id: config.client_id.clone(),
			client_secret: config.client_secret.clone(),
			endpoints: config.endpoints.clone(),
			retry: config.retry,
		}
	}

	/// Performs the client-credentials grant and returns the new access token.
	pub async fn issue(&self) -> Result<TokenSecret> {
		let request = RetryRequest::post(self.endpoints.token.clone())
			.form("client_id", self.client_id.as_str())
			.form("client_secret", self.client_secret.secret().as_str())
			.form("grant_type", "client_credentials")
			.validator(validator::has_access_token())
			.retries(self.retry.retries)
			.timeout(self.retry.timeout)
			.op(Op::Issue);
		let span = OpSpan::new(Op::Issue, "issue");
		let body = span.instrument(self.executor.execute_required(&request)).await?;
		let issued: IssuedToken = decode("token", body)?;

		Ok(TokenSecret::new(issued.access_token))
	}

	/// Introspects `token`.
	pub async fn introspect(&self, token: &TokenSecret) -> Result<TokenValidation> {
		let request = RetryRequest::get(self.endpoints.validate.clone())
			.header("Authorization", token.bearer())
			.header("Client-ID", self.client_id.as_str())
			.validator(validator::has_expires_in())
			.retries(self.retry.retries)
			.timeout(self.retry.timeout)
			.op(Op::Introspect);
		let span = OpSpan::new(Op::Introspect, "introspect");
		let body = span.instrument(self.executor.execute_required(&request)).await?;

		decode("validate", body)
	}
}
impl TokenAuthority for OAuthAuthority {
	fn issue_token(&self) -> AuthorityFuture<'_, TokenSecret> {
		Box::pin(self.issue())
	}

	fn validate_token<'a>(
		&'a self,
		token: &'a TokenSecret,
	) -> AuthorityFuture<'a, TokenValidation> {
		Box::pin(self.introspect(token))
	}
}

#[derive(Deserialize)]
struct IssuedToken {
	access_token: String,
}

/// Composition root owning the executor, authority, and lifecycle manager.
#[derive(Debug)]
pub struct TokenClient {
	executor: RetryExecutor,
	authority: Arc<OAuthAuthority>,
	manager: Arc<TokenManager>,
	client_id: ClientId,
	endpoints: Endpoints,
	retry: RetryPolicy,
}
impl TokenClient {
	/// Builds the full stack with a redirect-free reqwest client.
	pub async fn setup(config: ClientConfig) -> Result<Self> {
		let client =
			ReqwestClient::builder().redirect(Policy::none()).build().map_err(ConfigError::from)?;

		Self::setup_with_http_client(config, ReqwestHttpClient::with_client(client)).await
	}

	/// Builds the full stack over a caller-provided HTTP client.
	///
	/// Loads or creates the key, opens the encrypted store, loads the stored token, runs one
	/// validation pass (minting a token if none is held), and starts the periodic checks.
	pub async fn setup_with_http_client(
		config: ClientConfig,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		let executor = RetryExecutor::new(http_client);
		let authority = Arc::new(OAuthAuthority::new(executor.clone(), &config));
		let key = KeyStore::load_or_create(&config.paths.key_file)?;
		let store: Arc<dyn SecretStore> =
			Arc::new(EncryptedFileStore::open(&config.paths.token_file, &key, authority.clone())?);
		let manager = Arc::new(TokenManager::open(store, authority.clone(), config.refresh).await?);

		manager.validate_token().await?;
		manager.start_periodic_checks();

		Ok(Self {
			executor,
			authority,
			manager,
			client_id: config.client_id,
			endpoints: config.endpoints,
			retry: config.retry,
		})
	}

	/// Shared lifecycle manager.
	pub fn manager(&self) -> &Arc<TokenManager> {
		&self.manager
	}

	/// OAuth authority used by the manager.
	pub fn authority(&self) -> &OAuthAuthority {
		&self.authority
	}

	/// Fetches live status for up to [`MAX_LOOKUP_IDS`] identifiers with the current token.
	///
	/// Returns the provider's `data` field untouched, or `None` when the lookup is exhausted or
	/// the body has no `data`. Over-long lists and a missing token are rejected before any
	/// request is made.
	pub async fn live_status<S>(&self, ids: &[S]) -> Result<Option<Value>>
	where
		S: AsRef<str>,
	{
		if ids.len() > MAX_LOOKUP_IDS {
			return Err(
				InputError::TooManyIdentifiers { requested: ids.len(), max: MAX_LOOKUP_IDS }.into()
			);
		}

		let token = self.manager.token();

		if token.is_empty() {
			return Err(Error::MissingToken);
		}

		let request = ids.iter().fold(
			RetryRequest::get(self.endpoints.streams.clone())
				.header("Authorization", token.bearer())
				.header("Client-ID", self.client_id.as_str())
				.retries(self.retry.retries)
				.timeout(self.retry.timeout)
				.op(Op::Lookup),
			|request, id| request.query("user_login", id.as_ref()),
		);
		let span = OpSpan::new(Op::Lookup, "live_status");
		let body = span.instrument(self.executor.execute(&request)).await?;

		Ok(body.and_then(|mut body| body.get_mut("data").map(Value::take)))
	}

	/// Stops the periodic checks and waits for the task to exit.
	pub async fn shutdown(&self) {
		self.manager.stop().await;
	}
}

fn decode<T>(endpoint: &'static str, body: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(body).map_err(|source| Error::Decode { endpoint, source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn decode_reports_field_path() {
		let err = decode::<TokenValidation>("validate", serde_json::json!({ "expires_in": "soon" }))
			.expect_err("A string expires_in should not decode.");

		match err {
			Error::Decode { endpoint, source } => {
				assert_eq!(endpoint, "validate");
				assert_eq!(source.path().to_string(), "expires_in");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn issued_token_requires_string_access_token() {
		let ok: IssuedToken = decode("token", serde_json::json!({ "access_token": "abc" }))
			.expect("A string access_token should decode.");

		assert_eq!(ok.access_token, "abc");
		assert!(decode::<IssuedToken>("token", serde_json::json!({ "access_token": 1 })).is_err());
	}
}
