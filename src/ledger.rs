//! Notification dedup ledger.
//!
//! A marker is written to the substrate under
//! `alarm-notified-{alarmId}-{date}-{time}` when an alarm fires. While the
//! marker is alive the same `(alarm, date, time)` never notifies again. Each
//! marker expires `ttl` after it was written; expiry deadlines are held here
//! and serviced by [`DedupLedger::sweep`].

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::hhmm;
use crate::storage::KeyValueStore;

/// Common prefix of every marker key.
pub const MARKER_PREFIX: &str = "alarm-notified-";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkerRecord {
    fired_at: NaiveDateTime,
}

/// Builds the substrate key of the marker for one due instant.
pub fn marker_key(alarm_id: &str, date: NaiveDate, time: NaiveTime) -> String {
    format!(
        "{MARKER_PREFIX}{alarm_id}-{}-{}",
        date.format("%Y-%m-%d"),
        time.format(hhmm::FORMAT)
    )
}

pub struct DedupLedger {
    ttl: Duration,
    /// Marker key -> expiry deadline.
    expiries: BTreeMap<String, NaiveDateTime>,
}

impl DedupLedger {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, expiries: BTreeMap::new() }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether a live marker exists for this due instant.
    ///
    /// Markers recorded by this ledger are answered from memory, so a firing
    /// whose substrate write failed still counts. Otherwise the substrate is
    /// consulted: a marker whose value cannot be parsed counts as fired, one
    /// older than the TTL does not, even if it has not been swept yet.
    pub fn has_fired<S: KeyValueStore + ?Sized>(
        &self,
        kv: &S,
        alarm_id: &str,
        date: NaiveDate,
        time: NaiveTime,
        now: NaiveDateTime,
    ) -> Result<bool> {
        let key = marker_key(alarm_id, date, time);
        if let Some(deadline) = self.expiries.get(&key) {
            if now < *deadline {
                return Ok(true);
            }
        }
        let Some(raw) = kv.get(&key)? else {
            return Ok(false);
        };
        match serde_json::from_str::<MarkerRecord>(&raw) {
            Ok(record) => Ok(now < record.fired_at + self.ttl),
            Err(_) => Ok(true),
        }
    }

    /// Records the firing in memory, then writes the marker. The in-memory
    /// record and its expiry survive a failed write.
    pub fn mark_fired<S: KeyValueStore + ?Sized>(
        &mut self,
        kv: &mut S,
        alarm_id: &str,
        date: NaiveDate,
        time: NaiveTime,
        now: NaiveDateTime,
    ) -> Result<()> {
        let key = marker_key(alarm_id, date, time);
        self.expiries.insert(key.clone(), now + self.ttl);
        let json = serde_json::to_string(&MarkerRecord { fired_at: now })?;
        kv.set(&key, &json)?;
        debug!("marked {key} until {}", now + self.ttl);
        Ok(())
    }

    /// Removes every marker whose deadline has passed. Returns how many were
    /// removed; failed removals stay scheduled for the next sweep.
    pub fn sweep<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, now: NaiveDateTime) -> usize {
        let expired: Vec<String> = self
            .expiries
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            match kv.remove(&key) {
                Ok(()) => {
                    self.expiries.remove(&key);
                    removed += 1;
                }
                Err(e) => warn!("cannot remove expired marker {key}: {e}"),
            }
        }
        if removed > 0 {
            debug!("swept {removed} expired markers");
        }
        removed
    }

    /// Re-registers expiry for markers persisted by an earlier session and
    /// removes those already past their TTL. Unparsable markers are removed
    /// as well, since their age is unknown. Returns the number of markers
    /// still alive.
    pub fn restore<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, now: NaiveDateTime) -> Result<usize> {
        let keys: Vec<String> = kv.keys()?.into_iter().filter(|k| k.starts_with(MARKER_PREFIX)).collect();

        for key in keys {
            let record = kv.get(&key)?.and_then(|raw| serde_json::from_str::<MarkerRecord>(&raw).ok());
            match record {
                Some(record) if now < record.fired_at + self.ttl => {
                    self.expiries.insert(key, record.fired_at + self.ttl);
                }
                _ => {
                    debug!("removing stale marker {key}");
                    if let Err(e) = kv.remove(&key) {
                        warn!("cannot remove stale marker {key}: {e}");
                    }
                }
            }
        }
        Ok(self.expiries.len())
    }

    /// Forgets every scheduled expiry. Persisted markers are left in place
    /// for the next [`DedupLedger::restore`].
    pub fn cancel_pending(&mut self) {
        self.expiries.clear();
    }

    /// Number of markers with a scheduled expiry.
    pub fn pending(&self) -> usize {
        self.expiries.len()
    }
}
