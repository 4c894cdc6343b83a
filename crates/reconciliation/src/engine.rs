use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::timeout;

use vaxtrack_core::{LotId, Month};
use vaxtrack_inventory::{InventoryStore, LotSnapshot, StoreError};

use crate::error::{FailedWrite, PartialCommit, ReconciliationError, Violation};
use crate::session::{Phase, ReconciliationSession, Summary};

/// Bound on every individual store call made by the engine.
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a successful commit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    /// Lots whose quantity was corrected (zero-variance lots are never
    /// written).
    pub updated_count: usize,
    /// Signed sum of the committed variances, for audit purposes.
    pub total_variance: i64,
}

/// Owns one reconciliation session and the store it reconciles against.
///
/// Single logical session, single operator: the engine's operations run on
/// one control flow and session state needs no internal locking. Only
/// `commit` fans out concurrent store writes.
pub struct ReconciliationEngine {
    store: Arc<dyn InventoryStore>,
    session: ReconciliationSession,
    store_timeout: Duration,
}

impl ReconciliationEngine {
    /// Snapshot the inventory and open a setup-phase session over it.
    pub async fn start(store: Arc<dyn InventoryStore>) -> Result<Self, ReconciliationError> {
        Self::with_store_timeout(store, DEFAULT_STORE_TIMEOUT).await
    }

    pub async fn with_store_timeout(
        store: Arc<dyn InventoryStore>,
        store_timeout: Duration,
    ) -> Result<Self, ReconciliationError> {
        let snapshots = list_with_retry(store.as_ref(), store_timeout).await?;
        Ok(Self {
            store,
            session: ReconciliationSession::from_snapshots(snapshots),
            store_timeout,
        })
    }

    pub fn session(&self) -> &ReconciliationSession {
        &self.session
    }

    pub fn summary(&self) -> Summary {
        self.session.summary()
    }

    /// Select the calendar month this reconciliation covers (setup phase).
    pub fn set_month(&mut self, month: Month) -> Result<(), ReconciliationError> {
        self.require_phase(Phase::Setup)?;
        self.session.set_month(month);
        Ok(())
    }

    /// Setup -> Counting. Requires a month to be selected.
    pub fn begin_counting(&mut self) -> Result<(), ReconciliationError> {
        self.require_phase(Phase::Setup)?;
        if self.session.month().is_none() {
            return Err(ReconciliationError::Validation(vec![Violation::MonthNotSet]));
        }
        self.session.set_phase(Phase::Counting);
        Ok(())
    }

    /// Counting -> Review. Requires at least one counted entry, not full
    /// completeness; completeness is enforced at commit.
    pub fn begin_review(&mut self) -> Result<(), ReconciliationError> {
        self.require_phase(Phase::Counting)?;
        if self.summary().items_with_counts == 0 {
            return Err(ReconciliationError::InvalidInput(
                "at least one physical count is required before review".to_string(),
            ));
        }
        self.session.set_phase(Phase::Review);
        Ok(())
    }

    /// Review -> Counting, entries preserved.
    pub fn back_to_counting(&mut self) -> Result<(), ReconciliationError> {
        self.require_phase(Phase::Review)?;
        self.session.set_phase(Phase::Counting);
        Ok(())
    }

    /// Record the physically counted doses for one lot. Negative or
    /// out-of-range input is rejected, never coerced. Re-entrant and
    /// idempotent: counts can be revised any number of times while counting.
    pub fn set_physical_count(
        &mut self,
        lot_id: LotId,
        count: i64,
    ) -> Result<(), ReconciliationError> {
        self.require_phase(Phase::Counting)?;
        if count < 0 {
            return Err(ReconciliationError::InvalidInput(format!(
                "physical count cannot be negative, got {count}"
            )));
        }
        let count = u32::try_from(count).map_err(|_| {
            ReconciliationError::InvalidInput(format!("physical count out of range: {count}"))
        })?;

        let entry = self
            .session
            .entry_mut(lot_id)
            .ok_or(ReconciliationError::UnknownLot(lot_id))?;
        entry.set_physical_count(count);
        Ok(())
    }

    /// Record (or, with a blank input, clear) the explanation for a lot's
    /// discrepancy. A stale reason on an entry whose variance has returned to
    /// zero is retained but no longer required.
    pub fn set_discrepancy_reason(
        &mut self,
        lot_id: LotId,
        reason: &str,
    ) -> Result<(), ReconciliationError> {
        self.require_phase(Phase::Counting)?;
        let entry = self
            .session
            .entry_mut(lot_id)
            .ok_or(ReconciliationError::UnknownLot(lot_id))?;

        let trimmed = reason.trim();
        entry.set_discrepancy_reason(if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        });
        Ok(())
    }

    /// Read-only completeness check, deterministic for a given session state.
    /// Empty list = ready to commit.
    pub fn validate_for_commit(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.session.month().is_none() {
            violations.push(Violation::MonthNotSet);
        }

        let missing_counts = self
            .session
            .entries()
            .iter()
            .filter(|e| !e.is_counted())
            .count();
        if missing_counts > 0 {
            violations.push(Violation::MissingCounts {
                entries: missing_counts,
            });
        }

        let missing_reasons = self
            .session
            .entries()
            .iter()
            .filter(|e| e.needs_reason())
            .count();
        if missing_reasons > 0 {
            violations.push(Violation::MissingReasons {
                entries: missing_reasons,
            });
        }

        violations
    }

    /// Post every nonzero variance back to the store and tear the session
    /// down into a freshly derived setup-phase one.
    ///
    /// The per-lot writes are independent, so strict atomicity is not
    /// available; instead, when any subset fails the engine reports exactly
    /// which lots landed and which did not ([`PartialCommit`]), finalizes the
    /// landed entries in place, and keeps the failed entries' attempted
    /// counts so a repeated `commit` retries only those.
    pub async fn commit(&mut self) -> Result<CommitResult, ReconciliationError> {
        self.require_phase(Phase::Review)?;

        let violations = self.validate_for_commit();
        if !violations.is_empty() {
            return Err(ReconciliationError::Validation(violations));
        }

        let pending: Vec<PendingWrite> = self
            .session
            .entries()
            .iter()
            .filter(|e| e.has_discrepancy())
            .filter_map(|e| {
                Some(PendingWrite {
                    lot_id: e.lot_id(),
                    new_count: e.physical_count()?,
                    expected_version: e.snapshot().version,
                    difference: e.difference()?,
                })
            })
            .collect();

        if pending.is_empty() {
            let result = CommitResult {
                updated_count: 0,
                total_variance: 0,
            };
            tracing::info!(month = ?self.session.month(), "reconciliation committed, no variances");
            self.reset_session().await;
            return Ok(result);
        }

        let updated_at = Utc::now();
        let mut tasks: JoinSet<(LotId, Result<(), StoreError>)> = JoinSet::new();
        for write in &pending {
            let store = Arc::clone(&self.store);
            let write = *write;
            let limit = self.store_timeout;
            tasks.spawn(async move {
                let outcome = write_with_retry(store.as_ref(), write, updated_at, limit).await;
                (write.lot_id, outcome)
            });
        }

        let mut outcomes: HashMap<LotId, Result<(), StoreError>> =
            HashMap::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((lot_id, outcome)) => {
                    outcomes.insert(lot_id, outcome);
                }
                Err(e) => tracing::error!(error = %e, "commit task aborted"),
            }
        }

        // Partition in session order so the reported sets are deterministic.
        let mut succeeded: Vec<PendingWrite> = Vec::new();
        let mut failed: Vec<FailedWrite> = Vec::new();
        for write in pending {
            match outcomes.remove(&write.lot_id) {
                Some(Ok(())) => succeeded.push(write),
                Some(Err(error)) => failed.push(FailedWrite {
                    lot_id: write.lot_id,
                    error,
                }),
                None => failed.push(FailedWrite {
                    lot_id: write.lot_id,
                    error: StoreError::Unavailable("commit task aborted".to_string()),
                }),
            }
        }

        for write in &succeeded {
            if let Some(entry) = self.session.entry_mut(write.lot_id) {
                entry.finalize();
            }
        }

        if failed.is_empty() {
            let result = CommitResult {
                updated_count: succeeded.len(),
                total_variance: succeeded.iter().map(|w| w.difference).sum(),
            };
            tracing::info!(
                month = ?self.session.month(),
                updated = result.updated_count,
                variance = result.total_variance,
                "reconciliation committed"
            );
            self.reset_session().await;
            Ok(result)
        } else {
            tracing::warn!(
                succeeded = succeeded.len(),
                failed = failed.len(),
                "reconciliation commit partially failed"
            );
            Err(ReconciliationError::PartialCommit(PartialCommit {
                succeeded: succeeded.iter().map(|w| w.lot_id).collect(),
                failed,
            }))
        }
    }

    fn require_phase(&self, required: Phase) -> Result<(), ReconciliationError> {
        let actual = self.session.phase();
        if actual != required {
            return Err(ReconciliationError::Phase { required, actual });
        }
        Ok(())
    }

    /// Re-derive a fresh setup-phase session from the store. The commit has
    /// already landed at this point; a failed re-read falls back to an empty
    /// session rather than surfacing as a commit failure.
    async fn reset_session(&mut self) {
        match list_with_retry(self.store.as_ref(), self.store_timeout).await {
            Ok(snapshots) => self.session = ReconciliationSession::from_snapshots(snapshots),
            Err(e) => {
                tracing::warn!(error = %e, "could not re-derive session after commit");
                self.session = ReconciliationSession::from_snapshots(Vec::new());
            }
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct PendingWrite {
    lot_id: LotId,
    new_count: u32,
    expected_version: u64,
    difference: i64,
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Unavailable(format!(
            "store call exceeded {}s",
            limit.as_secs()
        ))),
    }
}

async fn list_with_retry(
    store: &dyn InventoryStore,
    limit: Duration,
) -> Result<Vec<LotSnapshot>, StoreError> {
    match bounded(limit, store.list_all()).await {
        Err(e) if e.is_transient() => {
            tracing::warn!(error = %e, "transient failure reading inventory, retrying once");
            bounded(limit, store.list_all()).await
        }
        other => other,
    }
}

async fn write_with_retry(
    store: &dyn InventoryStore,
    write: PendingWrite,
    updated_at: DateTime<Utc>,
    limit: Duration,
) -> Result<(), StoreError> {
    let attempt = || {
        store.update_quantity(
            write.lot_id,
            write.new_count,
            write.expected_version,
            updated_at,
        )
    };
    match bounded(limit, attempt()).await {
        Err(e) if e.is_transient() => {
            tracing::warn!(lot_id = %write.lot_id, error = %e, "transient store failure, retrying once");
            bounded(limit, attempt()).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use vaxtrack_inventory::{InMemoryInventoryStore, VaccineLot};

    fn lot(vaccine: &str, lot_number: &str, quantity: u32) -> VaccineLot {
        VaccineLot::new(
            LotId::new(),
            vaccine,
            lot_number,
            quantity,
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            "Freezer A",
            50,
            "COVID-19",
            Utc::now(),
        )
        .unwrap()
    }

    /// The standard three-lot fixture: system counts 250 / 150 / 75.
    fn three_lots() -> (Arc<InMemoryInventoryStore>, Vec<LotId>) {
        let lots = vec![
            lot("COVID-19 Pfizer", "PF001", 250),
            lot("Influenza Quad", "FLU002", 150),
            lot("Hepatitis B", "HEP003", 75),
        ];
        let ids = lots.iter().map(|l| l.id).collect();
        (Arc::new(InMemoryInventoryStore::seeded(lots)), ids)
    }

    fn month() -> Month {
        "2024-01".parse().unwrap()
    }

    async fn engine_in_counting(store: Arc<dyn InventoryStore>) -> ReconciliationEngine {
        let mut engine = ReconciliationEngine::start(store).await.unwrap();
        engine.set_month(month()).unwrap();
        engine.begin_counting().unwrap();
        engine
    }

    /// Store wrapper that fails quantity writes for selected lots with a
    /// transport error (both the attempt and its retry).
    struct FlakyStore {
        inner: InMemoryInventoryStore,
        fail_lots: Mutex<HashSet<LotId>>,
    }

    impl FlakyStore {
        fn new(inner: InMemoryInventoryStore) -> Self {
            Self {
                inner,
                fail_lots: Mutex::new(HashSet::new()),
            }
        }

        fn fail_writes_for(&self, lot_id: LotId) {
            self.fail_lots.lock().unwrap().insert(lot_id);
        }

        fn heal(&self, lot_id: LotId) {
            self.fail_lots.lock().unwrap().remove(&lot_id);
        }
    }

    #[async_trait]
    impl InventoryStore for FlakyStore {
        async fn list_all(&self) -> Result<Vec<LotSnapshot>, StoreError> {
            self.inner.list_all().await
        }

        async fn get(&self, lot_id: LotId) -> Result<VaccineLot, StoreError> {
            self.inner.get(lot_id).await
        }

        async fn insert(&self, lot: VaccineLot) -> Result<(), StoreError> {
            self.inner.insert(lot).await
        }

        async fn update_quantity(
            &self,
            lot_id: LotId,
            new_quantity: u32,
            expected_version: u64,
            updated_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            if self.fail_lots.lock().unwrap().contains(&lot_id) {
                return Err(StoreError::Unavailable(
                    "injected transport failure".to_string(),
                ));
            }
            self.inner
                .update_quantity(lot_id, new_quantity, expected_version, updated_at)
                .await
        }
    }

    /// Store that fails each write exactly once, then lets it through.
    struct FailOnceStore {
        inner: InMemoryInventoryStore,
        failed_once: Mutex<HashSet<LotId>>,
    }

    #[async_trait]
    impl InventoryStore for FailOnceStore {
        async fn list_all(&self) -> Result<Vec<LotSnapshot>, StoreError> {
            self.inner.list_all().await
        }

        async fn get(&self, lot_id: LotId) -> Result<VaccineLot, StoreError> {
            self.inner.get(lot_id).await
        }

        async fn insert(&self, lot: VaccineLot) -> Result<(), StoreError> {
            self.inner.insert(lot).await
        }

        async fn update_quantity(
            &self,
            lot_id: LotId,
            new_quantity: u32,
            expected_version: u64,
            updated_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            if self.failed_once.lock().unwrap().insert(lot_id) {
                return Err(StoreError::Unavailable("flaky write".to_string()));
            }
            self.inner
                .update_quantity(lot_id, new_quantity, expected_version, updated_at)
                .await
        }
    }

    #[tokio::test]
    async fn scenario_a_all_counts_match_commits_zero_updates() {
        let (store, ids) = three_lots();
        let mut engine = engine_in_counting(store.clone()).await;

        for (id, count) in ids.iter().zip([250, 150, 75]) {
            engine.set_physical_count(*id, count).unwrap();
        }

        assert_eq!(engine.summary().items_reconciled, 3);
        assert!(engine.validate_for_commit().is_empty());

        engine.begin_review().unwrap();
        let result = engine.commit().await.unwrap();
        assert_eq!(
            result,
            CommitResult {
                updated_count: 0,
                total_variance: 0
            }
        );

        // Nothing was written: versions untouched.
        for id in &ids {
            assert_eq!(store.get(*id).await.unwrap().version, 1);
        }

        // Fresh session, re-derived from the store.
        assert_eq!(engine.session().phase(), Phase::Setup);
        assert_eq!(engine.session().month(), None);
        assert_eq!(engine.session().entries().len(), 3);
        assert!(engine.session().entries().iter().all(|e| !e.is_counted()));
    }

    #[tokio::test]
    async fn scenario_b_missing_reason_blocks_commit() {
        let (store, ids) = three_lots();
        let mut engine = engine_in_counting(store).await;

        for (id, count) in ids.iter().zip([245, 150, 75]) {
            engine.set_physical_count(*id, count).unwrap();
        }
        engine.begin_review().unwrap();

        let violations = engine.validate_for_commit();
        assert_eq!(violations, vec![Violation::MissingReasons { entries: 1 }]);

        let err = engine.commit().await.unwrap_err();
        assert_eq!(err, ReconciliationError::Validation(violations));
        assert_eq!(engine.session().phase(), Phase::Review);
        assert_eq!(
            engine.session().entry(ids[0]).unwrap().physical_count(),
            Some(245)
        );
    }

    #[tokio::test]
    async fn scenario_c_explained_discrepancy_commits_one_update() {
        let (store, ids) = three_lots();
        let mut engine = engine_in_counting(store.clone()).await;

        for (id, count) in ids.iter().zip([245, 150, 75]) {
            engine.set_physical_count(*id, count).unwrap();
        }
        engine
            .set_discrepancy_reason(ids[0], "Counting error")
            .unwrap();
        engine.begin_review().unwrap();

        let result = engine.commit().await.unwrap();
        assert_eq!(
            result,
            CommitResult {
                updated_count: 1,
                total_variance: -5
            }
        );

        let corrected = store.get(ids[0]).await.unwrap();
        assert_eq!(corrected.quantity_on_hand, 245);
        assert_eq!(corrected.version, 2);

        // Zero-variance lots were never mutated.
        assert_eq!(store.get(ids[1]).await.unwrap().version, 1);
        assert_eq!(store.get(ids[2]).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn scenario_d_partial_failure_reports_both_sets_and_allows_retry() {
        let lots = vec![
            lot("COVID-19 Pfizer", "PF001", 250),
            lot("Influenza Quad", "FLU002", 150),
        ];
        let ids: Vec<LotId> = lots.iter().map(|l| l.id).collect();
        let flaky = Arc::new(FlakyStore::new(InMemoryInventoryStore::seeded(lots)));
        flaky.fail_writes_for(ids[0]);

        let mut engine = engine_in_counting(flaky.clone()).await;
        engine.set_physical_count(ids[0], 245).unwrap();
        engine.set_physical_count(ids[1], 140).unwrap();
        engine
            .set_discrepancy_reason(ids[0], "Counting error")
            .unwrap();
        engine
            .set_discrepancy_reason(ids[1], "Damage/spillage")
            .unwrap();
        engine.begin_review().unwrap();

        let err = engine.commit().await.unwrap_err();
        let ReconciliationError::PartialCommit(partial) = err else {
            panic!("expected PartialCommit, got {err:?}");
        };
        assert_eq!(partial.succeeded, vec![ids[1]]);
        assert_eq!(partial.failed.len(), 1);
        assert_eq!(partial.failed[0].lot_id, ids[0]);
        assert!(matches!(
            partial.failed[0].error,
            StoreError::Unavailable(_)
        ));

        // Lot 2 landed in the store and is finalized in the session.
        assert_eq!(flaky.get(ids[1]).await.unwrap().quantity_on_hand, 140);
        let lot2 = engine.session().entry(ids[1]).unwrap();
        assert!(lot2.reconciled());

        // Lot 1 is still pending with its attempted count intact.
        assert_eq!(engine.session().phase(), Phase::Review);
        let lot1 = engine.session().entry(ids[0]).unwrap();
        assert_eq!(lot1.physical_count(), Some(245));
        assert_eq!(lot1.difference(), Some(-5));
        assert_eq!(flaky.get(ids[0]).await.unwrap().quantity_on_hand, 250);

        // Retrying touches only the failed lot.
        flaky.heal(ids[0]);
        let result = engine.commit().await.unwrap();
        assert_eq!(
            result,
            CommitResult {
                updated_count: 1,
                total_variance: -5
            }
        );
        assert_eq!(flaky.get(ids[0]).await.unwrap().quantity_on_hand, 245);
        // Lot 2 was not written a second time.
        assert_eq!(flaky.get(ids[1]).await.unwrap().version, 2);
        assert_eq!(engine.session().phase(), Phase::Setup);
    }

    #[tokio::test]
    async fn scenario_e_unknown_lot_is_rejected_without_side_effects() {
        let (store, _ids) = three_lots();
        let mut engine = engine_in_counting(store).await;
        let before = engine.session().clone();

        let stranger = LotId::new();
        let err = engine.set_physical_count(stranger, 10).unwrap_err();
        assert_eq!(err, ReconciliationError::UnknownLot(stranger));
        assert_eq!(engine.session(), &before);

        let err = engine.set_discrepancy_reason(stranger, "???").unwrap_err();
        assert_eq!(err, ReconciliationError::UnknownLot(stranger));
        assert_eq!(engine.session(), &before);
    }

    #[tokio::test]
    async fn setting_the_same_count_twice_is_idempotent() {
        let (store, ids) = three_lots();
        let mut engine = engine_in_counting(store).await;

        engine.set_physical_count(ids[0], 245).unwrap();
        let once = engine.session().entry(ids[0]).unwrap().clone();
        engine.set_physical_count(ids[0], 245).unwrap();
        let twice = engine.session().entry(ids[0]).unwrap().clone();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn negative_count_is_rejected_not_coerced() {
        let (store, ids) = three_lots();
        let mut engine = engine_in_counting(store).await;

        let err = engine.set_physical_count(ids[0], -3).unwrap_err();
        assert!(matches!(err, ReconciliationError::InvalidInput(_)));
        assert!(!engine.session().entry(ids[0]).unwrap().is_counted());
    }

    #[tokio::test]
    async fn stale_reason_is_retained_but_not_required() {
        let (store, ids) = three_lots();
        let mut engine = engine_in_counting(store).await;

        engine.set_physical_count(ids[0], 245).unwrap();
        engine.set_discrepancy_reason(ids[0], "Theft/loss").unwrap();
        engine.set_physical_count(ids[0], 250).unwrap();

        let entry = engine.session().entry(ids[0]).unwrap();
        assert_eq!(entry.discrepancy_reason(), Some("Theft/loss"));
        assert!(entry.reconciled());
        assert!(!entry.needs_reason());
    }

    #[tokio::test]
    async fn blank_reason_clears_the_field() {
        let (store, ids) = three_lots();
        let mut engine = engine_in_counting(store).await;

        engine.set_physical_count(ids[0], 245).unwrap();
        engine.set_discrepancy_reason(ids[0], "Other").unwrap();
        engine.set_discrepancy_reason(ids[0], "   ").unwrap();
        let entry = engine.session().entry(ids[0]).unwrap();
        assert_eq!(entry.discrepancy_reason(), None);
        assert!(entry.needs_reason());
    }

    #[tokio::test]
    async fn counting_requires_a_month() {
        let (store, _) = three_lots();
        let mut engine = ReconciliationEngine::start(store).await.unwrap();

        let err = engine.begin_counting().unwrap_err();
        assert_eq!(
            err,
            ReconciliationError::Validation(vec![Violation::MonthNotSet])
        );
        assert_eq!(engine.session().phase(), Phase::Setup);
    }

    #[tokio::test]
    async fn review_requires_at_least_one_count() {
        let (store, ids) = three_lots();
        let mut engine = engine_in_counting(store).await;

        let err = engine.begin_review().unwrap_err();
        assert!(matches!(err, ReconciliationError::InvalidInput(_)));

        engine.set_physical_count(ids[0], 250).unwrap();
        engine.begin_review().unwrap();
        assert_eq!(engine.session().phase(), Phase::Review);
    }

    #[tokio::test]
    async fn review_round_trip_preserves_entries() {
        let (store, ids) = three_lots();
        let mut engine = engine_in_counting(store).await;

        engine.set_physical_count(ids[0], 245).unwrap();
        engine.begin_review().unwrap();
        let in_review = engine.session().entries().to_vec();
        engine.back_to_counting().unwrap();
        assert_eq!(engine.session().entries(), &in_review[..]);
        assert_eq!(engine.session().phase(), Phase::Counting);
    }

    #[tokio::test]
    async fn counting_operations_are_phase_guarded() {
        let (store, ids) = three_lots();
        let mut engine = ReconciliationEngine::start(store).await.unwrap();

        let err = engine.set_physical_count(ids[0], 1).unwrap_err();
        assert_eq!(
            err,
            ReconciliationError::Phase {
                required: Phase::Counting,
                actual: Phase::Setup,
            }
        );

        let err = engine.commit().await.unwrap_err();
        assert_eq!(
            err,
            ReconciliationError::Phase {
                required: Phase::Review,
                actual: Phase::Setup,
            }
        );
    }

    #[tokio::test]
    async fn validate_is_repeatable_and_ordered() {
        let (store, ids) = three_lots();
        let mut engine = ReconciliationEngine::start(store).await.unwrap();
        // No month, nothing counted.
        let first = engine.validate_for_commit();
        assert_eq!(
            first,
            vec![Violation::MonthNotSet, Violation::MissingCounts { entries: 3 }]
        );
        assert_eq!(engine.validate_for_commit(), first);

        engine.set_month(month()).unwrap();
        engine.begin_counting().unwrap();
        engine.set_physical_count(ids[0], 245).unwrap();
        assert_eq!(
            engine.validate_for_commit(),
            vec![
                Violation::MissingCounts { entries: 2 },
                Violation::MissingReasons { entries: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn transient_write_failure_is_retried_once() {
        let lots = vec![lot("COVID-19 Pfizer", "PF001", 250)];
        let id = lots[0].id;
        let store = Arc::new(FailOnceStore {
            inner: InMemoryInventoryStore::seeded(lots),
            failed_once: Mutex::new(HashSet::new()),
        });

        let mut engine = engine_in_counting(store.clone()).await;
        engine.set_physical_count(id, 245).unwrap();
        engine.set_discrepancy_reason(id, "Counting error").unwrap();
        engine.begin_review().unwrap();

        let result = engine.commit().await.unwrap();
        assert_eq!(result.updated_count, 1);
        assert_eq!(store.get(id).await.unwrap().quantity_on_hand, 245);
    }

    /// Store whose writes never complete; exercises the per-call timeout.
    struct HangingStore {
        inner: InMemoryInventoryStore,
    }

    #[async_trait]
    impl InventoryStore for HangingStore {
        async fn list_all(&self) -> Result<Vec<LotSnapshot>, StoreError> {
            self.inner.list_all().await
        }

        async fn get(&self, lot_id: LotId) -> Result<VaccineLot, StoreError> {
            self.inner.get(lot_id).await
        }

        async fn insert(&self, lot: VaccineLot) -> Result<(), StoreError> {
            self.inner.insert(lot).await
        }

        async fn update_quantity(
            &self,
            _lot_id: LotId,
            _new_quantity: u32,
            _expected_version: u64,
            _updated_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            std::future::pending::<Result<(), StoreError>>().await
        }
    }

    #[tokio::test]
    async fn hanging_write_times_out_as_a_failed_lot() {
        let lots = vec![lot("COVID-19 Pfizer", "PF001", 250)];
        let id = lots[0].id;
        let store = Arc::new(HangingStore {
            inner: InMemoryInventoryStore::seeded(lots),
        });

        let mut engine =
            ReconciliationEngine::with_store_timeout(store, Duration::from_millis(20))
                .await
                .unwrap();
        engine.set_month(month()).unwrap();
        engine.begin_counting().unwrap();
        engine.set_physical_count(id, 245).unwrap();
        engine.set_discrepancy_reason(id, "Counting error").unwrap();
        engine.begin_review().unwrap();

        let err = engine.commit().await.unwrap_err();
        let ReconciliationError::PartialCommit(partial) = err else {
            panic!("expected PartialCommit, got {err:?}");
        };
        assert!(partial.succeeded.is_empty());
        assert_eq!(partial.failed.len(), 1);
        assert!(matches!(
            partial.failed[0].error,
            StoreError::Unavailable(_)
        ));
    }
}
