// self
use crate::obs::{AttemptOutcome, Op};

/// Records one HTTP attempt via the global metrics recorder (when enabled).
pub fn record_attempt(op: Op, outcome: AttemptOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_token_keeper_attempt_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}

/// Records a freshly minted and persisted token.
pub fn record_regeneration() {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("oauth2_token_keeper_regeneration_total").increment(1);
	}
}
