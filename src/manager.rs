//! Token lifecycle manager: holds the current token, decides when to regenerate it, and runs the
//! periodic check task.
//!
//! The manager is in one of two states. `EMPTY` means the in-memory token is the sentinel;
//! `HELD` means it is a real token that either passed the last validation pass or was just
//! minted. Expiry is never cached: each pass asks the [`TokenAuthority`] afresh and regenerates
//! when `expires_in` falls below [`RefreshSettings::refresh_before`].
//!
//! Validation passes and regenerations are serialized, so the periodic task and explicit callers
//! never mint two tokens for the same decision. Readers of [`TokenManager::token`] are never
//! blocked by a pass and may briefly observe the previous token while a regeneration is in flight.

// crates.io
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{TokenAuthority, TokenSecret},
	obs::{self, Op, OpSpan, obs_event},
	store::SecretStore,
};

/// Default lead time before expiry at which a token is replaced (one day).
pub const DEFAULT_REFRESH_BEFORE: Duration = Duration::from_secs(86_400);
/// Default interval between periodic validation passes (one hour).
pub const DEFAULT_CHECK_EVERY: Duration = Duration::from_secs(3_600);

/// Timing constants fixed when the manager is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshSettings {
	/// Regenerate when the token expires in less than this.
	pub refresh_before: Duration,
	/// Sleep between periodic validation passes.
	pub check_every: Duration,
}
impl RefreshSettings {
	/// Overrides the refresh lead time.
	pub fn with_refresh_before(mut self, refresh_before: Duration) -> Self {
		self.refresh_before = refresh_before;

		self
	}

	/// Overrides the periodic interval.
	pub fn with_check_every(mut self, check_every: Duration) -> Self {
		self.check_every = check_every;

		self
	}
}
impl Default for RefreshSettings {
	fn default() -> Self {
		Self { refresh_before: DEFAULT_REFRESH_BEFORE, check_every: DEFAULT_CHECK_EVERY }
	}
}

/// Summary of the most recent validation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationSnapshot {
	/// `expires_in` reported for the token that was validated.
	pub expires_in: u64,
	/// When the pass finished.
	pub checked_at: OffsetDateTime,
	/// Whether the pass minted a new token.
	pub regenerated: bool,
}

/// Owns the in-memory token and its refresh schedule.
///
/// Build one per process with [`TokenManager::open`] and share it by reference or [`Arc`].
pub struct TokenManager {
	shared: Arc<Shared>,
	periodic: Mutex<Option<PeriodicTask>>,
}
impl TokenManager {
	/// Loads the persisted token (or the sentinel) into memory. Does not validate it.
	pub async fn open(
		store: Arc<dyn SecretStore>,
		authority: Arc<dyn TokenAuthority>,
		settings: RefreshSettings,
	) -> Result<Self> {
		let token = store.read().await?;

		obs_event!(debug, held = !token.is_empty(), "Loaded stored token.");

		Ok(Self {
			shared: Arc::new(Shared {
				store,
				authority,
				settings,
				token: RwLock::new(token),
				pass_guard: AsyncMutex::new(()),
				last_validation: RwLock::new(None),
			}),
			periodic: Mutex::new(None),
		})
	}

	/// Returns the current token without side effects.
	///
	/// The token was valid as of the last validation pass; it is not guaranteed unexpired, and
	/// it is the sentinel while the manager is `EMPTY`.
	pub fn token(&self) -> TokenSecret {
		self.shared.token.read().clone()
	}

	/// Timing constants in effect.
	pub fn settings(&self) -> RefreshSettings {
		self.shared.settings
	}

	/// Outcome of the most recent completed validation pass, if any.
	pub fn last_validation(&self) -> Option<ValidationSnapshot> {
		self.shared.last_validation.read().clone()
	}

	/// Runs one validation pass.
	///
	/// From `EMPTY`, regenerates first. Then introspects the current token and regenerates when
	/// it expires within [`RefreshSettings::refresh_before`].
	pub async fn validate_token(&self) -> Result<ValidationSnapshot> {
		self.shared.validate_token().await
	}

	/// Mints, persists, and swaps in a new token unconditionally.
	pub async fn regenerate(&self) -> Result<TokenSecret> {
		let _pass = self.shared.pass_guard.lock().await;

		self.shared.regenerate_locked().await
	}

	/// Persists a token obtained elsewhere and makes it current.
	pub async fn replace(&self, token: TokenSecret) -> Result<()> {
		let _pass = self.shared.pass_guard.lock().await;

		self.shared.store.update(token.clone()).await?;
		*self.shared.token.write() = token;

		Ok(())
	}

	/// Deletes the stored token and returns to `EMPTY`.
	pub async fn clear(&self) -> Result<()> {
		let _pass = self.shared.pass_guard.lock().await;

		self.shared.store.delete().await?;
		*self.shared.token.write() = TokenSecret::empty();
		*self.shared.last_validation.write() = None;

		Ok(())
	}

	/// Launches the periodic check task unless one is already running.
	///
	/// Returns `true` when a task was launched. The task sleeps
	/// [`RefreshSettings::check_every`], runs [`TokenManager::validate_token`], and repeats until
	/// [`TokenManager::stop`] is called or the manager is dropped. A failed pass is logged and the
	/// next tick proceeds as usual. Must be called from within a Tokio runtime.
	pub fn start_periodic_checks(&self) -> bool {
		let mut periodic = self.periodic.lock();

		if periodic.as_ref().is_some_and(|task| !task.join.is_finished()) {
			return false;
		}

		let cancel = CancellationToken::new();
		let join = tokio::spawn(run_periodic(self.shared.clone(), cancel.clone()));

		*periodic = Some(PeriodicTask { cancel, join });

		obs_event!(
			info,
			check_every_secs = self.shared.settings.check_every.as_secs_f64(),
			"Started periodic token checks."
		);

		true
	}

	/// Whether the periodic task is running.
	pub fn is_running(&self) -> bool {
		self.periodic.lock().as_ref().is_some_and(|task| !task.join.is_finished())
	}

	/// Signals the periodic task to stop and waits for it to exit.
	///
	/// A pass that is mid-flight is abandoned; the in-memory and persisted token are only ever
	/// replaced together, so abandoning one leaves both consistent.
	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	pub async fn stop(&self) {
		let task = self.periodic.lock().take();

		if let Some(task) = task {
			task.cancel.cancel();

			if let Err(e) = task.join.await {
				obs_event!(error, error = %e, "Periodic token task ended abnormally.");
			}
		}
	}
}
impl Drop for TokenManager {
	fn drop(&mut self) {
		if let Some(task) = self.periodic.get_mut().take() {
			task.cancel.cancel();
		}
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("token", &*self.shared.token.read())
			.field("settings", &self.shared.settings)
			.field("running", &self.is_running())
			.finish()
	}
}

struct Shared {
	store: Arc<dyn SecretStore>,
	authority: Arc<dyn TokenAuthority>,
	settings: RefreshSettings,
	token: RwLock<TokenSecret>,
	pass_guard: AsyncMutex<()>,
	last_validation: RwLock<Option<ValidationSnapshot>>,
}
impl Shared {
	async fn validate_token(&self) -> Result<ValidationSnapshot> {
		let span = OpSpan::new(Op::ValidationPass, "validate_token");

		span.instrument(async {
			let _pass = self.pass_guard.lock().await;
			let mut regenerated = false;
			let empty = self.token.read().is_empty();

			if empty {
				self.regenerate_locked().await?;

				regenerated = true;
			}

			let current = self.token.read().clone();
			let validation = self.authority.validate_token(&current).await?;

			if validation.expires_within(self.settings.refresh_before) {
				obs_event!(
					info,
					expires_in = validation.expires_in,
					refresh_before_secs = self.settings.refresh_before.as_secs(),
					"Token expires soon; regenerating."
				);

				self.regenerate_locked().await?;

				regenerated = true;
			}

			let snapshot = ValidationSnapshot {
				expires_in: validation.expires_in,
				checked_at: OffsetDateTime::now_utc(),
				regenerated,
			};

			*self.last_validation.write() = Some(snapshot.clone());

			Ok(snapshot)
		})
		.await
	}

	// Caller must hold `pass_guard`.
	async fn regenerate_locked(&self) -> Result<TokenSecret> {
		let token = self.store.create().await?;

		*self.token.write() = token.clone();

		obs::record_regeneration();
		obs_event!(info, "Regenerated access token.");

		Ok(token)
	}
}

struct PeriodicTask {
	cancel: CancellationToken,
	join: JoinHandle<()>,
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
async fn run_periodic(shared: Arc<Shared>, cancel: CancellationToken) {
	loop {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => break,
			_ = tokio::time::sleep(shared.settings.check_every) => {},
		}
		tokio::select! {
			biased;
			_ = cancel.cancelled() => break,
			result = shared.validate_token() => {
				if let Err(e) = result {
					obs_event!(error, error = %e, "Periodic token validation failed.");
				}
			},
		}
	}

	obs_event!(info, "Stopped periodic token checks.");
}
