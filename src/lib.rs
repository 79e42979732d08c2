//! Keeps a single OAuth 2.0 client-credentials token encrypted at rest and fresh in memory,
//! and ships the retrying HTTP executor used both to mint that token and to spend it.
//!
//! The moving parts, leaves first:
//!
//! - [`http::RetryExecutor`] runs one request with pluggable response validators and bounded
//!   retries.
//! - [`crypto::KeyStore`] loads (or creates once) the symmetric key protecting the token file.
//! - [`store::EncryptedFileStore`] persists the token as ciphertext behind the
//!   [`store::SecretStore`] create/read/update/delete surface.
//! - [`manager::TokenManager`] owns the in-memory token, validates it, regenerates it, and runs
//!   the periodic check task.
//! - [`client::TokenClient`] wires the OAuth issue/introspect calls into the manager and exposes
//!   authorized downstream lookups.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod http;
pub mod manager;
pub mod obs;
pub mod store;
pub mod watchlist;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use oauth2::{ClientId, ClientSecret};
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2::{ClientId, ClientSecret};
pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, wiremock as _};
