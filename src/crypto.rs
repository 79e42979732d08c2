//! Symmetric key management and the AES-256-GCM envelope protecting the token file.
//!
//! The key file holds [`KEY_LEN`] raw bytes and is created exactly once. Losing it makes every
//! previously written token unreadable; readers then see the sentinel and the lifecycle manager
//! mints a fresh token.
//!
//! Ciphertexts are URL-safe base64 of `nonce || ciphertext || tag`, with a fresh random nonce per
//! encryption.

// std
use std::{
	fs::{self, OpenOptions},
	io::{ErrorKind, Write},
	string::FromUtf8Error,
};
// crates.io
use aes_gcm::{
	Aes256Gcm, Key, Nonce,
	aead::{Aead, KeyInit},
};
use base64::{
	Engine,
	engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, error::ConfigError, obs::obs_event, store::StoreError};

/// Length in bytes of a [`SymmetricKey`].
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Raw key material. Debug output never shows the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; KEY_LEN]);
impl SymmetricKey {
	/// Draws a new random key.
	pub fn generate() -> Self {
		Self(rand::random())
	}

	/// Builds a key from exactly [`KEY_LEN`] bytes.
	pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
		<[u8; KEY_LEN]>::try_from(bytes).ok().map(Self)
	}

	/// Returns the raw key bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Short, non-reversible identifier safe to log.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0);

		URL_SAFE_NO_PAD.encode(&digest[..8])
	}
}
impl Debug for SymmetricKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SymmetricKey").field(&self.fingerprint()).finish()
	}
}

/// Loads the key file, creating it on first use.
#[derive(Clone, Copy, Debug)]
pub struct KeyStore;
impl KeyStore {
	/// Reads the key at `path`; when the file is absent, writes a fresh key and reads it back.
	///
	/// An existing file is never overwritten. A file of the wrong length is a configuration
	/// error rather than a reason to regenerate.
	pub fn load_or_create(path: impl AsRef<Path>) -> Result<SymmetricKey> {
		let path = path.as_ref();

		match fs::read(path) {
			Ok(bytes) => Self::parse(path, &bytes),
			Err(e) if e.kind() == ErrorKind::NotFound => {
				Self::create(path)?;

				let bytes = fs::read(path).map_err(|e| StoreError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				})?;

				Self::parse(path, &bytes)
			},
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to read {}: {e}", path.display()),
			}
			.into()),
		}
	}

	fn parse(path: &Path, bytes: &[u8]) -> Result<SymmetricKey> {
		SymmetricKey::from_bytes(bytes).ok_or_else(|| {
			ConfigError::InvalidKey {
				path: path.to_path_buf(),
				len: bytes.len(),
				expected: KEY_LEN,
			}
			.into()
		})
	}

	fn create(path: &Path) -> Result<(), StoreError> {
		crate::store::ensure_parent_exists(path)?;

		let key = SymmetricKey::generate();
		let mut options = OpenOptions::new();

		options.write(true).create_new(true);

		#[cfg(unix)]
		{
			use std::os::unix::fs::OpenOptionsExt;

			options.mode(0o600);
		}

		let mut file = match options.open(path) {
			Ok(file) => file,
			// Someone else created it between our read and open; theirs wins.
			Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to create {}: {e}", path.display()),
				}),
		};

		file.write_all(key.as_bytes()).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", path.display()),
		})?;
		file.sync_all().map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", path.display()),
		})?;

		obs_event!(
			info,
			path = %path.display(),
			fingerprint = %key.fingerprint(),
			"Generated a new encryption key."
		);

		Ok(())
	}
}

/// Reasons a ciphertext could not be turned back into a token.
#[derive(Debug, ThisError)]
pub enum CryptoError {
	/// The envelope is not valid base64.
	#[error("Ciphertext is not valid base64.")]
	Encoding(#[from] base64::DecodeError),
	/// The envelope is too short to hold a nonce and tag.
	#[error("Ciphertext is truncated ({len} bytes).")]
	Truncated {
		/// Decoded length in bytes.
		len: usize,
	},
	/// Authentication failed: wrong key or tampered data.
	#[error("Ciphertext failed authentication.")]
	Authentication,
	/// Plaintext is not UTF-8.
	#[error("Decrypted token is not UTF-8.")]
	Utf8(#[from] FromUtf8Error),
	/// The cipher refused to encrypt the plaintext.
	#[error("Token could not be encrypted.")]
	Encrypt,
}

/// AES-256-GCM cipher bound to one [`SymmetricKey`].
#[derive(Clone)]
pub struct TokenCipher {
	cipher: Aes256Gcm,
	fingerprint: String,
}
impl TokenCipher {
	/// Binds a cipher to `key`.
	pub fn new(key: &SymmetricKey) -> Self {
		Self {
			cipher: Aes256Gcm::new(&Key::<Aes256Gcm>::from(key.0)),
			fingerprint: key.fingerprint(),
		}
	}

	/// Encrypts `plaintext` into a base64 envelope.
	pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
		let nonce: [u8; NONCE_LEN] = rand::random();
		let sealed = self
			.cipher
			.encrypt(&Nonce::from(nonce), plaintext.as_bytes())
			.map_err(|_| CryptoError::Encrypt)?;
		let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());

		envelope.extend_from_slice(&nonce);
		envelope.extend_from_slice(&sealed);

		Ok(URL_SAFE.encode(envelope))
	}

	/// Opens a base64 envelope produced by [`TokenCipher::encrypt`] under the same key.
	pub fn decrypt(&self, envelope: &[u8]) -> Result<String, CryptoError> {
		let decoded = URL_SAFE.decode(envelope.trim_ascii())?;

		if decoded.len() < NONCE_LEN + TAG_LEN {
			return Err(CryptoError::Truncated { len: decoded.len() });
		}

		let (nonce, sealed) = decoded.split_at(NONCE_LEN);
		let nonce = <[u8; NONCE_LEN]>::try_from(nonce)
			.map_err(|_| CryptoError::Truncated { len: decoded.len() })?;
		let plaintext = self
			.cipher
			.decrypt(&Nonce::from(nonce), sealed)
			.map_err(|_| CryptoError::Authentication)?;

		Ok(String::from_utf8(plaintext)?)
	}
}
impl Debug for TokenCipher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCipher").field("key", &self.fingerprint).finish()
	}
}
