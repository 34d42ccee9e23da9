pub mod auto_raise;
pub mod correction;
pub mod diagnostics_store;

pub use auto_raise::{AutoRaiseReport, ChannelRaise, RaiseReason};
pub use correction::{CorrectionOutcome, CorrectionService};
pub use diagnostics_store::{DiagnosticsStore, SessionTrace};
