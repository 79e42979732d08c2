//! Capability contract for minting and introspecting tokens.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenValidation},
};

/// Boxed future returned by [`TokenAuthority`] methods.
pub type AuthorityFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Issues new tokens and reports how long an existing one has left.
///
/// [`TokenManager`](crate::manager::TokenManager) and
/// [`EncryptedFileStore`](crate::store::EncryptedFileStore) only ever talk to this trait, so tests
/// can swap the OAuth client for a scripted double.
pub trait TokenAuthority
where
	Self: Send + Sync,
{
	/// Mints a brand-new token.
	fn issue_token(&self) -> AuthorityFuture<'_, TokenSecret>;

	/// Introspects `token`. May itself be an authenticated call using that same token.
	fn validate_token<'a>(&'a self, token: &'a TokenSecret)
	-> AuthorityFuture<'a, TokenValidation>;
}
