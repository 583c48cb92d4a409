//! Pipeline entry points for watcher operations.
//!
//! - `detect`: compare an extracted domain against the last known one
//! - `Monitor::run_cycle`: one extract → detect → propagate pass
//! - `run_monitor`: repeat cycles on an interval until shut down
//! - `render_history`: printable history listing

pub mod cycle;
pub mod detect;
pub mod history;
pub mod monitor;

pub use cycle::{CycleReport, Monitor, PublishSink, RuleSink, SinkStatus};
pub use detect::{ChangeDetector, Detection, detect};
pub use history::render_history;
pub use monitor::run_monitor;
