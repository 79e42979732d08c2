//! Client configuration: credentials, endpoints, file locations, and timing policy.

// std
use std::env;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{DEFAULT_RETRIES, DEFAULT_TIMEOUT},
	manager::RefreshSettings,
};

/// Default OAuth token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
/// Default OAuth introspection endpoint.
pub const DEFAULT_VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";
/// Default downstream live-status endpoint.
pub const DEFAULT_STREAMS_URL: &str = "https://api.twitch.tv/helix/streams";
/// Default token file location.
pub const DEFAULT_TOKEN_FILE: &str = "token.enc";
/// Default key file location.
pub const DEFAULT_KEY_FILE: &str = "token.key";

/// Upstream and downstream URLs used by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
	/// `POST` client-credentials grant.
	pub token: Url,
	/// `GET` token introspection.
	pub validate: Url,
	/// `GET` live status lookup.
	pub streams: Url,
}
impl Endpoints {
	/// Parses the three endpoint URLs.
	pub fn parse(token: &str, validate: &str, streams: &str) -> Result<Self, ConfigError> {
		Ok(Self {
			token: parse_endpoint("token", token)?,
			validate: parse_endpoint("validate", validate)?,
			streams: parse_endpoint("streams", streams)?,
		})
	}

	/// Resolves `oauth2/token`, `oauth2/validate`, and `streams` under a single base URL.
	///
	/// Any path on the base is kept as a prefix, with or without a trailing slash.
	pub fn from_base(base: &str) -> Result<Self, ConfigError> {
		let mut base = parse_endpoint("base", base)?;

		if !base.path().ends_with('/') {
			let prefixed = format!("{}/", base.path());

			base.set_path(&prefixed);
		}

		let join = |endpoint: &'static str, path: &str| {
			base.join(path).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
		};

		Ok(Self {
			token: join("token", "oauth2/token")?,
			validate: join("validate", "oauth2/validate")?,
			streams: join("streams", "streams")?,
		})
	}

	/// Twitch's public endpoints.
	pub fn twitch() -> Result<Self, ConfigError> {
		Self::parse(DEFAULT_TOKEN_URL, DEFAULT_VALIDATE_URL, DEFAULT_STREAMS_URL)
	}
}

/// Where the encrypted token and its key live on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorePaths {
	/// Ciphertext of the current token.
	pub token_file: PathBuf,
	/// Raw symmetric key bytes.
	pub key_file: PathBuf,
}
impl StorePaths {
	/// Builds paths from explicit locations.
	pub fn new(token_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
		Self { token_file: token_file.into(), key_file: key_file.into() }
	}

	/// Places `token.enc` and `token.key` inside `dir`.
	pub fn in_dir(dir: impl AsRef<Path>) -> Self {
		let dir = dir.as_ref();

		Self::new(dir.join(DEFAULT_TOKEN_FILE), dir.join(DEFAULT_KEY_FILE))
	}
}
impl Default for StorePaths {
	fn default() -> Self {
		Self::new(DEFAULT_TOKEN_FILE, DEFAULT_KEY_FILE)
	}
}

/// Attempt budget and per-attempt timeout applied to every request the client makes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Attempts per request.
	pub retries: u32,
	/// Per-attempt timeout.
	pub timeout: Duration,
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { retries: DEFAULT_RETRIES, timeout: DEFAULT_TIMEOUT }
	}
}

/// Everything [`TokenClient::setup`](crate::client::TokenClient::setup) needs.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// OAuth client identifier, also sent as `Client-ID`.
	pub client_id: ClientId,
	/// OAuth client secret.
	pub client_secret: ClientSecret,
	/// Upstream/downstream URLs.
	pub endpoints: Endpoints,
	/// Token and key file locations.
	pub paths: StorePaths,
	/// Refresh lead time and periodic interval.
	pub refresh: RefreshSettings,
	/// Retry policy for every request.
	pub retry: RetryPolicy,
}
impl ClientConfig {
	/// Builds a config against Twitch's endpoints with default paths and timings.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
		Ok(Self {
			client_id: ClientId::new(client_id.into()),
			client_secret: ClientSecret::new(client_secret.into()),
			endpoints: Endpoints::twitch()?,
			paths: StorePaths::default(),
			refresh: RefreshSettings::default(),
			retry: RetryPolicy::default(),
		})
	}

	/// Reads `CLIENT_ID` and `CLIENT_SECRET` (required) plus `TOKEN_FILE` and `KEY_FILE`
	/// (optional) from the process environment.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Same as [`ClientConfig::from_env`] with a custom variable source.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |name: &'static str| {
			lookup(name).filter(|v| !v.is_empty()).ok_or(ConfigError::MissingEnv { name })
		};
		let mut config = Self::new(required("CLIENT_ID")?, required("CLIENT_SECRET")?)?;

		if let Some(token_file) = lookup("TOKEN_FILE") {
			config.paths.token_file = token_file.into();
		}
		if let Some(key_file) = lookup("KEY_FILE") {
			config.paths.key_file = key_file.into();
		}

		Ok(config)
	}

	/// Replaces the endpoints.
	pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Replaces the file locations.
	pub fn with_paths(mut self, paths: StorePaths) -> Self {
		self.paths = paths;

		self
	}

	/// Replaces the refresh timings.
	pub fn with_refresh(mut self, refresh: RefreshSettings) -> Self {
		self.refresh = refresh;

		self
	}

	/// Replaces the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}
}

fn parse_endpoint(endpoint: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}
