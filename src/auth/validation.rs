//! Introspection payload returned by the validation capability.

// self
use crate::_prelude::*;

/// Result of introspecting an access token.
///
/// `expires_in` is the only field that drives refresh decisions; the rest is carried for
/// observability and callers that care about the granted scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
	/// Seconds until the token expires.
	pub expires_in: u64,
	/// Token echoed back by the provider.
	#[serde(default)]
	pub access_token: String,
	/// Client the token was issued to.
	#[serde(default)]
	pub client_id: String,
	/// Granted scopes, in provider order.
	#[serde(default, deserialize_with = "nullable_scopes")]
	pub scopes: Vec<String>,
}
impl TokenValidation {
	/// Whether the token expires within `window`.
	pub fn expires_within(&self, window: Duration) -> bool {
		Duration::from_secs(self.expires_in) < window
	}
}

fn nullable_scopes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
