//! Storage contract for the single managed token and its built-in backends.

pub mod file;
pub mod memory;

pub use file::EncryptedFileStore;
pub use memory::MemoryStore;

// std
use std::fs;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Boxed future returned by [`SecretStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Create/read/update/delete surface over the persisted token.
///
/// Reads never fail on unreadable data: a missing, empty, or undecryptable record is reported
/// as [`TokenSecret::empty`].
pub trait SecretStore
where
	Self: Send + Sync,
{
	/// Mints a token through the store's authority, persists it, and returns the plaintext.
	fn create(&self) -> StoreFuture<'_, TokenSecret>;

	/// Returns the persisted token, or the sentinel when none is readable.
	fn read(&self) -> StoreFuture<'_, TokenSecret>;

	/// Persists a token obtained elsewhere.
	fn update(&self, token: TokenSecret) -> StoreFuture<'_, ()>;

	/// Resets the persisted token to the sentinel.
	fn delete(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`SecretStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// The token could not be sealed for storage.
	#[error("Encryption error: {message}.")]
	Encryption {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

pub(crate) fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_can_be_serialized() {
		let error = StoreError::Backend { message: "disk full".into() };
		let payload = serde_json::to_string(&error).expect("StoreError should serialize to JSON.");
		let round_trip: StoreError =
			serde_json::from_str(&payload).expect("Serialized error should deserialize from JSON.");

		assert_eq!(round_trip, error);
		assert_eq!(error.to_string(), "Backend failure: disk full.");
	}
}
