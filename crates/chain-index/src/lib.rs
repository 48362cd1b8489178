//! Traversal of hash-linked snapshot chains.
//!
//! Every dataset is published as a singly linked list of immutable snapshots,
//! each pointing at its predecessor through `previous hash`. The head is the
//! newest snapshot; the root has no predecessor.
//!
//! ```text
//! head ──prev──► h(n-1) ──prev──► ... ──prev──► root ──► none
//! ```
//!
//! [`ChainIndex`] walks that list backward, one metadata fetch per step and
//! strictly sequentially, and produces:
//!
//! - [`ChainIndex::walk`]: the whole chain, oldest first
//! - [`ChainIndex::walk_as_of`]: only snapshots generated at or before a cutoff
//! - [`ChainIndex::resolve_for_date`]: the newest snapshot whose coverage holds a date
//!
//! Traversal tracks visited ids and fails with [`DWeatherError::CorruptChain`]
//! if a back-pointer re-enters the chain.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use content_store::ContentStore;
use dweather_common::{DWeatherError, DWeatherResult, Snapshot, SnapshotId};

/// Read-only view over the chains held in a [`ContentStore`].
pub struct ChainIndex<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ContentStore + ?Sized> ChainIndex<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// All snapshots reachable from `head`, oldest first.
    #[instrument(skip(self), fields(head = %head))]
    pub async fn walk(&self, head: &SnapshotId) -> DWeatherResult<Vec<Snapshot>> {
        self.collect(head, |_| true).await
    }

    /// Snapshots reachable from `head` that were generated at or before `cutoff`,
    /// oldest first. Excluded snapshots are still traversed through.
    #[instrument(skip(self), fields(head = %head, cutoff = %cutoff))]
    pub async fn walk_as_of(
        &self,
        head: &SnapshotId,
        cutoff: DateTime<Utc>,
    ) -> DWeatherResult<Vec<Snapshot>> {
        self.collect(head, |s| s.metadata.generated_at <= cutoff)
            .await
    }

    /// Ids of every snapshot reachable from `head`, oldest first.
    pub async fn snapshot_ids(&self, head: &SnapshotId) -> DWeatherResult<Vec<SnapshotId>> {
        Ok(self
            .walk(head)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect())
    }

    /// The newest snapshot whose covered range contains `target`.
    ///
    /// The head's `full date range`, when published, is checked first so that
    /// dates outside the chain fail without walking it. A date inside the overall
    /// bound that no snapshot covers is reported as a hole in coverage.
    #[instrument(skip(self), fields(head = %head, target = %target))]
    pub async fn resolve_for_date(
        &self,
        head: &SnapshotId,
        target: NaiveDate,
    ) -> DWeatherResult<Snapshot> {
        let mut walk = BackwardWalk::new(self.store, head.clone());
        let mut seen_bounds: Option<(NaiveDate, NaiveDate)> = None;
        let mut checked_full_range = false;

        while let Some(snapshot) = walk.step().await? {
            if !checked_full_range {
                checked_full_range = true;
                if let Some(full) = snapshot.metadata.full_covered_range {
                    check_bound(target, full.start_date(), full.end_date())?;
                }
            }

            let range = snapshot.metadata.covered_range;
            if range.contains_date(target) {
                info!(snapshot = %snapshot.id, steps = walk.steps, "Resolved snapshot for date");
                return Ok(snapshot);
            }

            seen_bounds = Some(match seen_bounds {
                None => (range.start_date(), range.end_date()),
                Some((lo, hi)) => (lo.min(range.start_date()), hi.max(range.end_date())),
            });
        }

        if let Some((earliest, latest)) = seen_bounds {
            check_bound(target, earliest, latest)?;
        }

        Err(DWeatherError::date_out_of_range(format!(
            "{} is unavailable due to a hole in coverage",
            target
        )))
    }

    async fn collect<F>(&self, head: &SnapshotId, include: F) -> DWeatherResult<Vec<Snapshot>>
    where
        F: Fn(&Snapshot) -> bool,
    {
        let mut walk = BackwardWalk::new(self.store, head.clone());
        let mut chain = VecDeque::new();

        while let Some(snapshot) = walk.step().await? {
            if include(&snapshot) {
                chain.push_front(snapshot);
            } else {
                debug!(snapshot = %snapshot.id, "Excluded by cutoff");
            }
        }

        debug!(length = chain.len(), steps = walk.steps, "Walked chain");
        Ok(chain.into())
    }
}

fn check_bound(target: NaiveDate, earliest: NaiveDate, latest: NaiveDate) -> DWeatherResult<()> {
    if target > latest {
        return Err(DWeatherError::date_out_of_range(format!(
            "{} is later than available data (latest {})",
            target, latest
        )));
    }
    if target < earliest {
        return Err(DWeatherError::date_out_of_range(format!(
            "{} is earlier than available data (earliest {})",
            target, earliest
        )));
    }
    Ok(())
}

/// Iterative head-to-root cursor with a visited-set cycle guard.
struct BackwardWalk<'a, S: ?Sized> {
    store: &'a S,
    next: Option<SnapshotId>,
    visited: HashSet<SnapshotId>,
    steps: usize,
}

impl<'a, S: ContentStore + ?Sized> BackwardWalk<'a, S> {
    fn new(store: &'a S, head: SnapshotId) -> Self {
        Self {
            store,
            next: Some(head),
            visited: HashSet::new(),
            steps: 0,
        }
    }

    /// Fetch the next snapshot toward the root, or `None` once past the root.
    async fn step(&mut self) -> DWeatherResult<Option<Snapshot>> {
        let Some(id) = self.next.take() else {
            return Ok(None);
        };

        if !self.visited.insert(id.clone()) {
            return Err(DWeatherError::CorruptChain(format!(
                "snapshot {} is reachable from itself after {} steps",
                id, self.steps
            )));
        }

        let metadata = match self.store.get_metadata(&id).await {
            Ok(metadata) => metadata,
            Err(e) if e.is_not_found() => {
                return Err(DWeatherError::dataset(format!(
                    "snapshot {} is not resolvable",
                    id
                )))
            }
            Err(e) => return Err(e),
        };

        self.steps += 1;
        debug!(snapshot = %id, previous = ?metadata.previous_id, "Visited snapshot");
        self.next = metadata.previous_id.clone();
        Ok(Some(Snapshot::new(id, metadata)))
    }
}
