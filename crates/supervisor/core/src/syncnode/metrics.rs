use crate::syncnode::{ManagedNodeError, ResetOutcome};
use alloy_primitives::ChainId;
use std::time::Instant;

#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const SUPERVISOR_NODE_RESET_SUCCESS_TOTAL: &'static str =
        "kona_supervisor_node_reset_success_total";
    pub(crate) const SUPERVISOR_NODE_RESET_PRE_INTEROP_TOTAL: &'static str =
        "kona_supervisor_node_reset_pre_interop_total";
    pub(crate) const SUPERVISOR_NODE_RESET_ERROR_TOTAL: &'static str =
        "kona_supervisor_node_reset_error_total";
    pub(crate) const SUPERVISOR_NODE_RESET_DURATION_SECONDS: &'static str =
        "kona_supervisor_node_reset_duration_seconds";
    pub(crate) const SUPERVISOR_NODE_RESET_BISECTION_PROBES: &'static str =
        "kona_supervisor_node_reset_bisection_probes";

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::SUPERVISOR_NODE_RESET_SUCCESS_TOTAL,
            metrics::Unit::Count,
            "Total number of managed node resets to a bisected target",
        );

        metrics::describe_counter!(
            Self::SUPERVISOR_NODE_RESET_PRE_INTEROP_TOTAL,
            metrics::Unit::Count,
            "Total number of managed node resets to the pre-interop state",
        );

        metrics::describe_counter!(
            Self::SUPERVISOR_NODE_RESET_ERROR_TOTAL,
            metrics::Unit::Count,
            "Total number of failed or cancelled managed node resets",
        );

        metrics::describe_histogram!(
            Self::SUPERVISOR_NODE_RESET_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Latency of managed node resets",
        );

        metrics::describe_histogram!(
            Self::SUPERVISOR_NODE_RESET_BISECTION_PROBES,
            metrics::Unit::Count,
            "Number of node queries needed to find a reset target",
        );
    }

    fn zero() {
        metrics::counter!(Self::SUPERVISOR_NODE_RESET_SUCCESS_TOTAL).increment(0);

        metrics::counter!(Self::SUPERVISOR_NODE_RESET_PRE_INTEROP_TOTAL).increment(0);

        metrics::counter!(Self::SUPERVISOR_NODE_RESET_ERROR_TOTAL).increment(0);

        metrics::histogram!(Self::SUPERVISOR_NODE_RESET_DURATION_SECONDS).record(0.0);

        metrics::histogram!(Self::SUPERVISOR_NODE_RESET_BISECTION_PROBES).record(0.0);
    }

    pub(crate) fn record_bisection_probes(chain_id: ChainId, probes: u64) {
        metrics::histogram!(
            Self::SUPERVISOR_NODE_RESET_BISECTION_PROBES,
            "chain_id" => chain_id.to_string(),
        )
        .record(probes as f64);
    }

    pub(crate) fn record_reset(
        chain_id: ChainId,
        started_at: Instant,
        result: &Result<ResetOutcome, ManagedNodeError>,
    ) {
        let counter = match result {
            Ok(ResetOutcome::Reset(_)) => Self::SUPERVISOR_NODE_RESET_SUCCESS_TOTAL,
            Ok(ResetOutcome::PreInterop) => Self::SUPERVISOR_NODE_RESET_PRE_INTEROP_TOTAL,
            Err(_) => Self::SUPERVISOR_NODE_RESET_ERROR_TOTAL,
        };
        metrics::counter!(counter, "chain_id" => chain_id.to_string()).increment(1);

        if result.is_ok() {
            metrics::histogram!(
                Self::SUPERVISOR_NODE_RESET_DURATION_SECONDS,
                "chain_id" => chain_id.to_string(),
            )
            .record(started_at.elapsed().as_secs_f64());
        }
    }
}
