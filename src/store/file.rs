//! Encrypted single-token file store.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenAuthority, TokenSecret},
	crypto::{SymmetricKey, TokenCipher},
	obs::obs_event,
	store::{self, SecretStore, StoreError, StoreFuture},
};

/// Persists the token as AES-256-GCM ciphertext, replacing the file atomically on every write.
///
/// An absent or zero-length file is the sentinel. `delete` truncates the file to zero bytes, so
/// no code path ever writes plaintext.
pub struct EncryptedFileStore {
	path: PathBuf,
	cipher: TokenCipher,
	authority: Arc<dyn TokenAuthority>,
	write_guard: Mutex<()>,
}
impl EncryptedFileStore {
	/// Opens a store at `path` sealed under `key`; new tokens come from `authority`.
	pub fn open(
		path: impl Into<PathBuf>,
		key: &SymmetricKey,
		authority: Arc<dyn TokenAuthority>,
	) -> Result<Self, StoreError> {
		let path = path.into();

		store::ensure_parent_exists(&path)?;

		Ok(Self { path, cipher: TokenCipher::new(key), authority, write_guard: Mutex::new(()) })
	}

	/// Location of the token file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	fn read_now(&self) -> TokenSecret {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return TokenSecret::empty(),
			Err(e) => {
				obs_event!(
					warn,
					path = %self.path.display(),
					error = %e,
					"Token file is unreadable; treating as empty."
				);

				return TokenSecret::empty();
			},
		};

		if bytes.trim_ascii().is_empty() {
			return TokenSecret::empty();
		}

		match self.cipher.decrypt(&bytes) {
			Ok(token) => TokenSecret::new(token),
			Err(e) => {
				obs_event!(
					warn,
					path = %self.path.display(),
					error = %e,
					"Stored token cannot be decrypted; treating as empty."
				);

				TokenSecret::empty()
			},
		}
	}

	fn write_now(&self, token: &TokenSecret) -> Result<(), StoreError> {
		let contents = if token.is_empty() {
			String::new()
		} else {
			self.cipher
				.encrypt(token.expose())
				.map_err(|e| StoreError::Encryption { message: e.to_string() })?
		};

		self.persist(contents.as_bytes())
	}

	fn persist(&self, contents: &[u8]) -> Result<(), StoreError> {
		let _guard = self.write_guard.lock();

		store::ensure_parent_exists(&self.path)?;

		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(contents).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl SecretStore for EncryptedFileStore {
	fn create(&self) -> StoreFuture<'_, TokenSecret> {
		Box::pin(async move {
			let token = self.authority.issue_token().await?;

			self.write_now(&token)?;

			Ok(token)
		})
	}

	fn read(&self) -> StoreFuture<'_, TokenSecret> {
		Box::pin(async move { Ok(self.read_now()) })
	}

	fn update(&self, token: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move { Ok(self.write_now(&token)?) })
	}

	fn delete(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { Ok(self.persist(&[])?) })
	}
}
impl Debug for EncryptedFileStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EncryptedFileStore")
			.field("path", &self.path)
			.field("cipher", &self.cipher)
			.finish()
	}
}
