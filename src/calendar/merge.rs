use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::calendar::event::CalendarEvent;
use crate::calendar::store::CalendarStore;
use crate::predict::PREDICTION_HORIZON_DAYS;

/// Time bounds the store is reconciled against.
#[derive(Debug, Clone, Copy)]
pub struct MergeWindow {
    pub now: DateTime<Utc>,
    /// How long an event is kept after its start.
    pub grace: Duration,
    pub horizon: Duration,
}

impl MergeWindow {
    pub fn new(now: DateTime<Utc>, grace: Duration) -> Self {
        Self {
            now,
            grace,
            horizon: Duration::days(PREDICTION_HORIZON_DAYS),
        }
    }

    fn expired(&self, event: &CalendarEvent) -> bool {
        event.start < self.now - self.grace
    }

    fn beyond_horizon(&self, event: &CalendarEvent) -> bool {
        event.start > self.now + self.horizon
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        self.added + self.updated + self.removed > 0
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} updated, {} removed, {} unchanged",
            self.added, self.updated, self.removed, self.unchanged
        )
    }
}

/// Reconcile `store` against the full current set of qualifying events.
///
/// Candidates are inserted or replaced by identity key; events whose content
/// is unchanged keep their `updated_at`. Stored events are removed when they
/// started before `now - grace`, or when they have not yet ended but are no
/// longer among the candidates. Events that ended within the grace window are
/// kept even if the source stopped reporting them.
pub fn merge(
    mut store: CalendarStore,
    candidates: Vec<CalendarEvent>,
    window: &MergeWindow,
) -> (CalendarStore, MergeReport) {
    let mut report = MergeReport::default();
    let mut current = BTreeSet::new();

    for candidate in candidates {
        if window.expired(&candidate) || window.beyond_horizon(&candidate) {
            continue;
        }
        if !current.insert(candidate.uid.clone()) {
            log::warn!("Duplicate pass {} in one run, keeping the first", candidate.uid);
            continue;
        }
        match store.get(&candidate.uid) {
            None => {
                report.added += 1;
                store.upsert(CalendarEvent {
                    updated_at: window.now,
                    ..candidate
                });
            }
            Some(existing) if existing.same_content(&candidate) => report.unchanged += 1,
            Some(_) => {
                report.updated += 1;
                store.upsert(CalendarEvent {
                    updated_at: window.now,
                    ..candidate
                });
            }
        }
    }

    let before = store.len();
    store.retain(|event| {
        if window.expired(event) {
            log::debug!("Removing {}: started before the grace window", event.uid);
            return false;
        }
        if !current.contains(&event.uid) && event.end > window.now {
            log::debug!("Removing {}: no longer a qualifying pass", event.uid);
            return false;
        }
        true
    });
    report.removed = before - store.len();

    (store, report)
}
