//! Cumulative network byte counters.
//!
//! The runner attributes traffic to an operation by diffing two snapshots,
//! which only works while one operation runs at a time.

use std::collections::VecDeque;
use std::sync::Mutex;

use sysinfo::Networks;

/// Cumulative sent/received bytes at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetSnapshot {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

impl NetSnapshot {
    /// Bytes moved between `earlier` and `self`. Counter resets clamp to zero.
    #[must_use]
    pub fn delta_since(&self, earlier: &NetSnapshot) -> NetSnapshot {
        NetSnapshot {
            bytes_sent: self.bytes_sent.saturating_sub(earlier.bytes_sent),
            bytes_recv: self.bytes_recv.saturating_sub(earlier.bytes_recv),
        }
    }
}

/// Source of cumulative byte counters.
pub trait NetCounters: Send + Sync {
    fn snapshot(&self) -> NetSnapshot;
}

/// System-wide totals summed over every interface.
#[derive(Debug, Default)]
pub struct SystemNetCounters;

impl NetCounters for SystemNetCounters {
    fn snapshot(&self) -> NetSnapshot {
        let networks = Networks::new_with_refreshed_list();
        networks
            .list()
            .values()
            .fold(NetSnapshot::default(), |acc, data| NetSnapshot {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
            })
    }
}

/// Replays a fixed sequence of snapshots, then repeats the last one.
#[derive(Debug, Default)]
pub struct ScriptedNetCounters {
    script: Mutex<VecDeque<NetSnapshot>>,
    last: Mutex<NetSnapshot>,
}

impl ScriptedNetCounters {
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = NetSnapshot>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(NetSnapshot::default()),
        }
    }

    /// Counters that never move.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }
}

impl NetCounters for ScriptedNetCounters {
    fn snapshot(&self) -> NetSnapshot {
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let Ok(mut last) = self.last.lock() else {
            return next.unwrap_or_default();
        };
        if let Some(snapshot) = next {
            *last = snapshot;
        }
        *last
    }
}
