//! Metrics of the managed-mode session.

use crate::ManagedModeError;
use kona_interop::ManagedEventKind;

/// What happened to an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventOutcome {
    Emitted,
    Deduplicated,
    Filtered,
}

/// Container for the managed-mode metrics.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    /// Outbound events queued for the supervisor.
    pub(crate) const MANAGED_MODE_EVENTS_EMITTED_TOTAL: &'static str =
        "kona_managed_mode_events_emitted_total";
    /// Outbound events dropped as duplicates.
    pub(crate) const MANAGED_MODE_EVENTS_DEDUPLICATED_TOTAL: &'static str =
        "kona_managed_mode_events_deduplicated_total";
    /// Outbound events dropped for predating interop.
    pub(crate) const MANAGED_MODE_EVENTS_FILTERED_TOTAL: &'static str =
        "kona_managed_mode_events_filtered_total";
    /// Inbound commands received.
    pub(crate) const MANAGED_MODE_COMMANDS_TOTAL: &'static str = "kona_managed_mode_commands_total";
    /// Inbound commands that failed.
    pub(crate) const MANAGED_MODE_COMMAND_ERRORS_TOTAL: &'static str =
        "kona_managed_mode_command_errors_total";

    /// Describes and zeroes the metrics.
    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::MANAGED_MODE_EVENTS_EMITTED_TOTAL,
            metrics::Unit::Count,
            "Events queued for the supervisor",
        );
        metrics::describe_counter!(
            Self::MANAGED_MODE_EVENTS_DEDUPLICATED_TOTAL,
            metrics::Unit::Count,
            "Events dropped as duplicates",
        );
        metrics::describe_counter!(
            Self::MANAGED_MODE_EVENTS_FILTERED_TOTAL,
            metrics::Unit::Count,
            "Events dropped because their block predates interop",
        );
        metrics::describe_counter!(
            Self::MANAGED_MODE_COMMANDS_TOTAL,
            metrics::Unit::Count,
            "Commands received from the supervisor",
        );
        metrics::describe_counter!(
            Self::MANAGED_MODE_COMMAND_ERRORS_TOTAL,
            metrics::Unit::Count,
            "Commands from the supervisor that failed",
        );
    }

    fn zero() {
        for kind in ManagedEventKind::ALL {
            let kind = kind.to_string();
            metrics::counter!(Self::MANAGED_MODE_EVENTS_EMITTED_TOTAL, "kind" => kind.clone())
                .increment(0);
            metrics::counter!(Self::MANAGED_MODE_EVENTS_DEDUPLICATED_TOTAL, "kind" => kind.clone())
                .increment(0);
            metrics::counter!(Self::MANAGED_MODE_EVENTS_FILTERED_TOTAL, "kind" => kind)
                .increment(0);
        }
    }

    pub(crate) fn record_event(kind: ManagedEventKind, outcome: EventOutcome) {
        let name = match outcome {
            EventOutcome::Emitted => Self::MANAGED_MODE_EVENTS_EMITTED_TOTAL,
            EventOutcome::Deduplicated => Self::MANAGED_MODE_EVENTS_DEDUPLICATED_TOTAL,
            EventOutcome::Filtered => Self::MANAGED_MODE_EVENTS_FILTERED_TOTAL,
        };
        metrics::counter!(name, "kind" => kind.to_string()).increment(1);
    }

    pub(crate) fn record_command<T>(method: &'static str, result: &Result<T, ManagedModeError>) {
        metrics::counter!(Self::MANAGED_MODE_COMMANDS_TOTAL, "method" => method).increment(1);
        if result.is_err() {
            metrics::counter!(Self::MANAGED_MODE_COMMAND_ERRORS_TOTAL, "method" => method)
                .increment(1);
        }
    }
}
