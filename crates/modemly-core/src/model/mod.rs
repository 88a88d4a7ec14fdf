// ── Domain model ──
//
// Canonical, unit-normalized records produced by the parser. Field
// names are ours, not the firmware's.

pub mod event_log;
pub mod signal;

pub use event_log::{EventIdentity, EventLogEntry, Severity};
pub use signal::{Direction, SignalReading};
