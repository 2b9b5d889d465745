// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-lead critical sections.
//!
//! Event processing and the dispatcher both take the lead's lock before
//! touching its conversation, so a reply and a concurrently-firing step
//! serialize: whichever wins the race sees the other's committed effects.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one async mutex per lead id.
#[derive(Default)]
pub struct LeadLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LeadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lead's lock, creating it on first use.
    pub async fn acquire(&self, lead_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(lead_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn same_lead_serializes_different_leads_do_not() {
        let locks = Arc::new(LeadLocks::new());
        let peak = Arc::new(AtomicUsize::new(0));
        let active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..8 {
            let locks = locks.clone();
            let peak = peak.clone();
            let active = active.clone();
            // Half the tasks contend on one lead, half get distinct leads.
            let lead = if i % 2 == 0 {
                "shared".to_string()
            } else {
                format!("lead-{i}")
            };
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&lead).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                lead
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        // Distinct leads overlap; the shared lead alone never exceeds one.
        assert!(peak.load(Ordering::SeqCst) > 1);

        let guard = locks.acquire("shared").await;
        let locks2 = locks.clone();
        let blocked = tokio::spawn(async move {
            let _g = locks2.acquire("shared").await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!blocked.is_finished());
        drop(guard);
        blocked.await.unwrap();
    }
}
