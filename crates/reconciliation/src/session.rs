use serde::Serialize;

use vaxtrack_core::{LotId, Month};
use vaxtrack_inventory::LotSnapshot;

/// Workflow phase of a reconciliation session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Counting,
    Review,
}

/// One mutable working record per lot under reconciliation.
///
/// `difference` and `reconciled` are always derived from the physical count
/// and the snapshot, never settable on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationEntry {
    snapshot: LotSnapshot,
    physical_count: Option<u32>,
    discrepancy_reason: Option<String>,
}

impl ReconciliationEntry {
    fn new(snapshot: LotSnapshot) -> Self {
        Self {
            snapshot,
            physical_count: None,
            discrepancy_reason: None,
        }
    }

    pub fn lot_id(&self) -> LotId {
        self.snapshot.id
    }

    pub fn snapshot(&self) -> &LotSnapshot {
        &self.snapshot
    }

    pub fn physical_count(&self) -> Option<u32> {
        self.physical_count
    }

    pub fn discrepancy_reason(&self) -> Option<&str> {
        self.discrepancy_reason.as_deref()
    }

    /// Physical minus system count; `None` until the lot has been counted.
    pub fn difference(&self) -> Option<i64> {
        self.physical_count
            .map(|physical| i64::from(physical) - i64::from(self.snapshot.system_count))
    }

    /// Counted and the count matches the system exactly.
    pub fn reconciled(&self) -> bool {
        self.difference() == Some(0)
    }

    pub fn is_counted(&self) -> bool {
        self.physical_count.is_some()
    }

    /// Counted with a nonzero variance.
    pub fn has_discrepancy(&self) -> bool {
        matches!(self.difference(), Some(d) if d != 0)
    }

    /// A discrepant entry without an explanation blocks commit.
    pub fn needs_reason(&self) -> bool {
        self.has_discrepancy()
            && self
                .discrepancy_reason
                .as_deref()
                .map_or(true, |r| r.trim().is_empty())
    }

    pub(crate) fn set_physical_count(&mut self, count: u32) {
        self.physical_count = Some(count);
    }

    pub(crate) fn set_discrepancy_reason(&mut self, reason: Option<String>) {
        self.discrepancy_reason = reason;
    }

    /// The corrective write for this lot landed: the system of record now
    /// matches the physical count, one version later.
    pub(crate) fn finalize(&mut self) {
        if let Some(count) = self.physical_count {
            self.snapshot.system_count = count;
            self.snapshot.version += 1;
        }
    }
}

/// Aggregate progress over a session, recomputed on demand.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_items: usize,
    pub items_with_counts: usize,
    pub items_reconciled: usize,
    pub items_with_discrepancies: usize,
    /// `items_with_counts / total_items`, rounded; 0 for an empty session.
    pub progress_percent: u32,
}

/// One reconciliation pass: a month, an ordered entry per lot, and the
/// current workflow phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationSession {
    month: Option<Month>,
    entries: Vec<ReconciliationEntry>,
    phase: Phase,
}

impl ReconciliationSession {
    /// Derive a fresh setup-phase session from store snapshots. Duplicate lot
    /// ids are collapsed to the first occurrence (one entry per lot).
    pub(crate) fn from_snapshots(snapshots: Vec<LotSnapshot>) -> Self {
        let mut entries: Vec<ReconciliationEntry> = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            if entries.iter().all(|e| e.lot_id() != snapshot.id) {
                entries.push(ReconciliationEntry::new(snapshot));
            }
        }
        Self {
            month: None,
            entries,
            phase: Phase::Setup,
        }
    }

    pub fn month(&self) -> Option<Month> {
        self.month
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn entries(&self) -> &[ReconciliationEntry] {
        &self.entries
    }

    pub fn entry(&self, lot_id: LotId) -> Option<&ReconciliationEntry> {
        self.entries.iter().find(|e| e.lot_id() == lot_id)
    }

    pub(crate) fn entry_mut(&mut self, lot_id: LotId) -> Option<&mut ReconciliationEntry> {
        self.entries.iter_mut().find(|e| e.lot_id() == lot_id)
    }

    pub(crate) fn set_month(&mut self, month: Month) {
        self.month = Some(month);
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Pure aggregate over the entries.
    pub fn summary(&self) -> Summary {
        let total_items = self.entries.len();
        let items_with_counts = self.entries.iter().filter(|e| e.is_counted()).count();
        let items_reconciled = self.entries.iter().filter(|e| e.reconciled()).count();
        let items_with_discrepancies =
            self.entries.iter().filter(|e| e.has_discrepancy()).count();

        let progress_percent = if total_items == 0 {
            0
        } else {
            (items_with_counts as f64 / total_items as f64 * 100.0).round() as u32
        };

        Summary {
            total_items,
            items_with_counts,
            items_reconciled,
            items_with_discrepancies,
            progress_percent,
        }
    }
}
