//! Optional observability helpers for token operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named `oauth2_token_keeper.op`
//!   with the `op` and `stage` fields, plus warn/error events for rejected attempts, exhausted
//!   retries, and unreadable token files.
//! - Enable `metrics` to increment `oauth2_token_keeper_attempt_total` for every HTTP attempt,
//!   labeled by `op` + `outcome`, and `oauth2_token_keeper_regeneration_total` for every freshly
//!   minted token.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Emits a `tracing` event when the feature is enabled; expands to nothing otherwise.
macro_rules! obs_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		::tracing::$level!($($arg)+);
	};
}
pub(crate) use obs_event;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
	/// Client-credentials token issuance.
	Issue,
	/// Token introspection.
	Introspect,
	/// Authorized downstream status lookup.
	Lookup,
	/// Caller-built request without a more specific label.
	Request,
	/// One `validate_token` pass of the lifecycle manager.
	ValidationPass,
}
impl Op {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Op::Issue => "issue",
			Op::Introspect => "introspect",
			Op::Lookup => "lookup",
			Op::Request => "request",
			Op::ValidationPass => "validation_pass",
		}
	}
}
impl Display for Op {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each HTTP attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
	/// Every validator accepted the response.
	Accepted,
	/// A response arrived but a validator rejected it.
	Rejected,
	/// The request failed before a usable response arrived.
	Transport,
}
impl AttemptOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AttemptOutcome::Accepted => "accepted",
			AttemptOutcome::Rejected => "rejected",
			AttemptOutcome::Transport => "transport",
		}
	}
}
impl Display for AttemptOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
