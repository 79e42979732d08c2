//! File-backed list of tracked identifiers, ready to feed [`TokenClient::live_status`].
//!
//! Names are stored lowercased and deduplicated. Every change first moves the current file to
//! `<file>.bak`, then writes the new list, so a crash mid-write leaves the previous list in the
//! backup. Loading falls back to the backup when the primary file is missing.
//!
//! [`TokenClient::live_status`]: crate::client::TokenClient::live_status

// std
use std::{
	ffi::OsString,
	fs::{self, File},
	io::Write,
};
// self
use crate::{
	_prelude::*,
	client::MAX_LOOKUP_IDS,
	error::InputError,
	obs::obs_event,
	store::{self, StoreError},
};

/// Persistent, lowercased, duplicate-free list of tracked identifiers.
#[derive(Debug)]
pub struct Watchlist {
	path: PathBuf,
	names: RwLock<Vec<String>>,
}
impl Watchlist {
	/// Loads the list from `path`, or from its backup, or starts empty.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();
		let backup = backup_path(&path);
		let names = if path.exists() {
			load(&path)?
		} else if backup.exists() {
			obs_event!(info, path = %backup.display(), "Loaded watchlist from backup.");

			load(&backup)?
		} else {
			Vec::new()
		};

		Ok(Self { path, names: RwLock::new(names) })
	}

	/// Location of the primary file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Snapshot of the tracked names in insertion order.
	pub fn list(&self) -> Vec<String> {
		self.names.read().clone()
	}

	/// Whether nothing is tracked.
	pub fn is_empty(&self) -> bool {
		self.names.read().is_empty()
	}

	/// Tracks `names`, lowercased. Returns whether the list changed.
	///
	/// Batches larger than [`MAX_LOOKUP_IDS`] are rejected as a whole.
	pub fn add<I, S>(&self, names: I) -> Result<bool>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let batch = names.into_iter().map(|n| n.as_ref().to_lowercase()).collect::<Vec<_>>();

		if batch.len() > MAX_LOOKUP_IDS {
			return Err(
				InputError::TooManyIdentifiers { requested: batch.len(), max: MAX_LOOKUP_IDS }
					.into(),
			);
		}

		let mut guard = self.names.write();
		let mut changed = false;

		for name in batch {
			if !guard.contains(&name) {
				guard.push(name);

				changed = true;
			}
		}

		if changed {
			self.persist_locked(&guard)?;
		}

		Ok(changed)
	}

	/// Stops tracking `names`, lowercased. Returns whether the list changed.
	pub fn remove<I, S>(&self, names: I) -> Result<bool>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let batch = names.into_iter().map(|n| n.as_ref().to_lowercase()).collect::<Vec<_>>();
		let mut guard = self.names.write();
		let before = guard.len();

		guard.retain(|name| !batch.contains(name));

		let changed = guard.len() != before;

		if changed {
			self.persist_locked(&guard)?;
		}

		Ok(changed)
	}

	fn persist_locked(&self, names: &[String]) -> Result<(), StoreError> {
		store::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec(names).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize watchlist: {e}"),
		})?;

		if self.path.exists() {
			let backup = backup_path(&self.path);

			fs::rename(&self.path, &backup).map_err(|e| StoreError::Backend {
				message: format!("Failed to back up {}: {e}", self.path.display()),
			})?;
		}

		let mut file = File::create(&self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to create {}: {e}", self.path.display()),
		})?;

		file.write_all(&serialized).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", self.path.display()),
		})?;
		file.sync_all().map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", self.path.display()),
		})
	}
}

fn backup_path(path: &Path) -> PathBuf {
	let mut name = path.file_name().map(OsString::from).unwrap_or_default();

	name.push(".bak");
	path.with_file_name(name)
}

fn load(path: &Path) -> Result<Vec<String>, StoreError> {
	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.trim_ascii().is_empty() {
		return Ok(Vec::new());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	fn cleanup(path: &Path) {
		for file in [path.to_path_buf(), backup_path(path)] {
			if file.exists() {
				fs::remove_file(&file).unwrap_or_else(|e| {
					panic!("Failed to remove temporary watchlist file {}: {e}", file.display())
				});
			}
		}
	}

	#[test]
	fn add_lowercases_dedups_and_persists_with_backup() {
		let path = temp_path("watchlist.json");
		let list = Watchlist::open(&path).expect("Opening a fresh watchlist should succeed.");

		assert!(list.is_empty());
		assert!(list.add(["Alpha", "beta", "ALPHA"]).expect("Add should succeed."));
		assert!(!list.add(["beta"]).expect("Add should succeed."));
		assert_eq!(list.list(), vec!["alpha".to_owned(), "beta".to_owned()]);
		assert!(!backup_path(&path).exists(), "The first write has nothing to back up.");
		assert!(list.add(["gamma"]).expect("Add should succeed."));
		assert!(backup_path(&path).exists());

		let reopened = Watchlist::open(&path).expect("Reopening should succeed.");

		assert_eq!(reopened.list(), vec!["alpha", "beta", "gamma"]);

		cleanup(&path);
	}

	#[test]
	fn remove_and_backup_fallback() {
		let path = temp_path("watchlist_remove.json");
		let list = Watchlist::open(&path).expect("Opening a fresh watchlist should succeed.");

		list.add(["one", "two"]).expect("Add should succeed.");

		assert!(list.remove(["TWO", "missing"]).expect("Remove should succeed."));
		assert!(!list.remove(["missing"]).expect("Remove should succeed."));

		fs::remove_file(&path).expect("Primary file should be removable.");

		let recovered = Watchlist::open(&path).expect("Opening from backup should succeed.");

		assert_eq!(recovered.list(), vec!["one", "two"]);

		cleanup(&path);
	}

	#[test]
	fn oversized_batches_are_rejected() {
		let path = temp_path("watchlist_oversized.json");
		let list = Watchlist::open(&path).expect("Opening a fresh watchlist should succeed.");
		let names = (0..=MAX_LOOKUP_IDS).map(|i| format!("user{i}")).collect::<Vec<_>>();
		let err = list.add(&names).expect_err("A batch of 101 names should be rejected.");

		assert!(matches!(err, Error::Input(InputError::TooManyIdentifiers { requested: 101, .. })));
		assert!(list.is_empty());
		assert!(!path.exists());
	}
}
