use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use vaxtrack_core::{LotId, Month};
use vaxtrack_inventory::{VaccineLot, WastageClass};
use vaxtrack_reconciliation::{ReconciliationEntry, ReconciliationSession, Summary};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SetMonthRequest {
    pub month: Month,
}

#[derive(Debug, Deserialize)]
pub struct SetCountRequest {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetReasonRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveShipmentRequest {
    pub received_date: NaiveDate,
    pub vaccine: String,
    pub lot_number: String,
    pub quantity_sent: u32,
    pub quantity_received: u32,
    pub doses_passed: u32,
    pub doses_failed: u32,
    pub supplier: String,
    pub shipment_id: String,
    pub received_by: String,
    pub storage_temperature: String,
    pub expiration_date: NaiveDate,
    pub location: String,
    pub minimum_stock: u32,
    pub vaccine_family: String,
}

#[derive(Debug, Deserialize)]
pub struct AdministerDosesRequest {
    pub lot_id: LotId,
    pub administered_date: NaiveDate,
    pub doses_used: u32,
    pub patient_age_group: String,
    pub administered_by: String,
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportLossRequest {
    pub lot_id: LotId,
    pub reported_date: NaiveDate,
    pub quantity: u32,
    pub reason: String,
    pub estimated_value: f64,
    pub reported_by: String,
    pub description: String,
    pub wastage_type: WastageClass,
}

// -------------------------
// Response mapping
// -------------------------

pub fn lot_json(lot: &VaccineLot) -> Value {
    json!({
        "id": lot.id,
        "vaccine": lot.vaccine,
        "lot_number": lot.lot_number,
        "quantity_on_hand": lot.quantity_on_hand,
        "expiration_date": lot.expiration_date,
        "location": lot.location,
        "minimum_stock": lot.minimum_stock,
        "vaccine_family": lot.vaccine_family,
        "last_updated": lot.last_updated,
        "version": lot.version,
    })
}

/// Entries go out with their derived fields materialized, mirroring what the
/// count table shows: system count, physical count, difference, reconciled.
pub fn entry_json(entry: &ReconciliationEntry) -> Value {
    json!({
        "lot_id": entry.lot_id(),
        "vaccine": entry.snapshot().vaccine,
        "lot_number": entry.snapshot().lot_number,
        "system_count": entry.snapshot().system_count,
        "physical_count": entry.physical_count(),
        "difference": entry.difference(),
        "reconciled": entry.reconciled(),
        "discrepancy_reason": entry.discrepancy_reason(),
    })
}

pub fn summary_json(summary: &Summary) -> Value {
    json!({
        "total_items": summary.total_items,
        "items_with_counts": summary.items_with_counts,
        "items_reconciled": summary.items_reconciled,
        "items_with_discrepancies": summary.items_with_discrepancies,
        "progress_percent": summary.progress_percent,
    })
}

pub fn session_json(session: &ReconciliationSession) -> Value {
    json!({
        "phase": session.phase(),
        "month": session.month(),
        "entries": session.entries().iter().map(entry_json).collect::<Vec<_>>(),
        "summary": summary_json(&session.summary()),
    })
}
