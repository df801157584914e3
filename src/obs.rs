//! Observability helpers for extraction stages.
//!
//! Every stage runs inside a `hc_extract.stage` span carrying the `stage` field (and the
//! appliance identifier for per-device work). Enable the `metrics` feature to increment the
//! `hc_extract_stage_total` counter for every attempt/success/failure, labeled by
//! `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Interactive browser login up to the captured authorization code.
	Authorization,
	/// Code-for-token exchange.
	TokenExchange,
	/// Appliance directory fetch.
	Directory,
	/// Device description archive fetch + rewrite.
	Bundle,
	/// Archive and manifest persistence.
	Registry,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Authorization => "authorization",
			Stage::TokenExchange => "token_exchange",
			Stage::Directory => "directory",
			Stage::Bundle => "bundle",
			Stage::Registry => "registry",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
