//! Crate-level error types shared by the executor, stores, manager, and client facade.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Caller-side precondition violation, rejected before any network call.
	#[error(transparent)]
	Input(#[from] InputError),

	/// Every attempt of a critical request failed.
	#[error("Failed to get a valid response from {url} after {attempts} attempt(s).")]
	RetriesExhausted {
		/// Target URL of the exhausted request.
		url: Url,
		/// Number of attempts made.
		attempts: u32,
		/// What the final attempt observed.
		#[source]
		last: LastAttempt,
	},
	/// An accepted response body could not be mapped onto the expected payload.
	#[error("Response from the {endpoint} endpoint could not be decoded.")]
	Decode {
		/// Endpoint label (`token`, `validate`, ...).
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// An authorized call was attempted while no token is held.
	#[error("No access token is currently held.")]
	MissingToken,
}

/// Outcome of the final attempt recorded on [`Error::RetriesExhausted`].
#[derive(Debug, ThisError)]
pub enum LastAttempt {
	/// A response arrived but at least one validator rejected it.
	#[error("HTTP {status} response was rejected: {body_preview}")]
	Rejected {
		/// HTTP status code of the rejected response.
		status: u16,
		/// Leading part of the response body.
		body_preview: String,
	},
	/// No response arrived; the request itself failed.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Configuration and validation failures raised during setup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured endpoint is not a valid URL.
	#[error("Endpoint `{endpoint}` is not a valid URL.")]
	InvalidEndpoint {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A required environment variable is not set.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// The key file exists but does not hold a usable key.
	#[error("Key file {} holds {len} bytes; expected {expected}.", path.display())]
	InvalidKey {
		/// Path of the offending key file.
		path: PathBuf,
		/// Observed length in bytes.
		len: usize,
		/// Required length in bytes.
		expected: usize,
	},
	/// A retry request was configured with zero attempts.
	#[error("A retry request needs at least one attempt.")]
	ZeroRetries,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Request-level failures: connection, timeout, protocol, or malformed bodies.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL.
		url: Url,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Response body was not valid JSON.
	#[error("Response body from {url} is not valid JSON.")]
	MalformedBody {
		/// Target URL.
		url: Url,
		/// JSON parsing failure.
		#[source]
		source: serde_json::Error,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url, source: Box::new(src) }
	}
}

/// Caller-side precondition violations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum InputError {
	/// More identifiers were supplied than one request may carry.
	#[error("Cannot handle {requested} identifiers at once; the limit is {max}.")]
	TooManyIdentifiers {
		/// Number of identifiers supplied.
		requested: usize,
		/// Maximum accepted per call.
		max: usize,
	},
}
