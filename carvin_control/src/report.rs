//! Reporter that writes protocol output to the tracing subscriber.

use carvin_common::control::error::AlarmCause;
use carvin_common::control::report::{Feedback, StatusSnapshot};
use tracing::{error, info, warn};

use crate::hal::Reporter;

/// Emits status snapshots as JSON and alarms/feedback by name.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report_status(&mut self, status: &StatusSnapshot) {
        match serde_json::to_string(status) {
            Ok(json) => info!(target: "carvin::status", state = status.state.name(), "{json}"),
            Err(e) => warn!("status serialization failed: {e}"),
        }
    }

    fn report_alarm(&mut self, cause: AlarmCause) {
        error!(target: "carvin::alarm", code = cause.code(), "{cause}");
    }

    fn report_feedback(&mut self, feedback: Feedback) {
        info!(target: "carvin::feedback", "{feedback}");
    }
}
