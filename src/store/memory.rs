//! Thread-safe in-memory [`SecretStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{TokenAuthority, TokenSecret},
	store::{SecretStore, StoreFuture},
};

/// Keeps the token in-process; nothing survives a restart.
#[derive(Clone)]
pub struct MemoryStore {
	token: Arc<RwLock<TokenSecret>>,
	authority: Arc<dyn TokenAuthority>,
}
impl MemoryStore {
	/// Builds an empty store minting tokens through `authority`.
	pub fn new(authority: Arc<dyn TokenAuthority>) -> Self {
		Self { token: Default::default(), authority }
	}

	/// Builds a store already holding `token`.
	pub fn with_token(authority: Arc<dyn TokenAuthority>, token: TokenSecret) -> Self {
		Self { token: Arc::new(RwLock::new(token)), authority }
	}
}
impl SecretStore for MemoryStore {
	fn create(&self) -> StoreFuture<'_, TokenSecret> {
		Box::pin(async move {
			let token = self.authority.issue_token().await?;

			*self.token.write() = token.clone();

			Ok(token)
		})
	}

	fn read(&self) -> StoreFuture<'_, TokenSecret> {
		let token = self.token.read().clone();

		Box::pin(async move { Ok(token) })
	}

	fn update(&self, token: TokenSecret) -> StoreFuture<'_, ()> {
		*self.token.write() = token;

		Box::pin(async { Ok(()) })
	}

	fn delete(&self) -> StoreFuture<'_, ()> {
		*self.token.write() = TokenSecret::empty();

		Box::pin(async { Ok(()) })
	}
}
impl Debug for MemoryStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryStore").field("token", &*self.token.read()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[tokio::test]
	async fn crud_cycle() {
		let authority = Arc::new(ScriptedAuthority::default());
		let store = MemoryStore::new(authority.clone());

		assert!(store.read().await.expect("Read should not fail.").is_empty());
		assert_eq!(store.create().await.expect("Create should succeed.").expose(), "token-1");
		assert_eq!(store.read().await.expect("Read should not fail.").expose(), "token-1");

		store.update(TokenSecret::new("manual")).await.expect("Update should succeed.");

		assert_eq!(store.read().await.expect("Read should not fail.").expose(), "manual");

		store.delete().await.expect("Delete should succeed.");

		assert!(store.read().await.expect("Read should not fail.").is_empty());
		assert_eq!(authority.issued(), 1);
	}
}
