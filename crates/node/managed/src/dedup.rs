//! Per-kind de-duplication of outbound events.

use crate::DedupConfig;
use alloy_eips::BlockNumHash;
use kona_interop::ManagedEventKind;
use std::collections::HashMap;
use tokio::time::Instant;

/// Drops an event when the previous event of the same kind was about the same block and
/// arrived within that kind's window.
#[derive(Debug)]
pub(crate) struct EventDeduper {
    config: DedupConfig,
    last: HashMap<ManagedEventKind, (Option<BlockNumHash>, Instant)>,
}

impl EventDeduper {
    pub(crate) fn new(config: DedupConfig) -> Self {
        Self { config, last: HashMap::new() }
    }

    /// Returns true if the event is a duplicate. Otherwise records it as the latest of its kind.
    pub(crate) fn is_duplicate(
        &mut self,
        kind: ManagedEventKind,
        block: Option<BlockNumHash>,
        now: Instant,
    ) -> bool {
        if let Some((last_block, seen_at)) = self.last.get(&kind) &&
            *last_block == block &&
            now.duration_since(*seen_at) < self.config.window(kind)
        {
            return true;
        }

        self.last.insert(kind, (block, now));
        false
    }
}
