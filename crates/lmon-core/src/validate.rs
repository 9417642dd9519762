//! Request validation: the first step of the ingestion pipeline. Collects
//! every field error before failing, rather than
//! stopping at the first one, so callers get a complete picture in one
//! round trip.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use lmon_errors::{Error, FieldError, Result};
use lmon_schemas::{BusinessStatus, Direction, NewSettlement, SettlementType};

/// The wire shape of `POST /api/settlements`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub settlement_id: String,
    pub settlement_version: i64,
    pub pts: String,
    pub processing_entity: String,
    pub counterparty_id: String,
    /// ISO 8601 date, e.g. `"2026-07-28"`.
    pub value_date: String,
    pub currency: String,
    pub amount: String,
    pub business_status: String,
    pub direction: String,
    pub settlement_type: String,
}

fn non_empty(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    }
}

fn is_iso4217_shape(currency: &str) -> bool {
    currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic())
}

/// Validates an `IngestRequest` and, on success, returns the `NewSettlement`
/// ready for `store::save`. On failure, returns every field error collected.
pub fn validate(req: &IngestRequest) -> Result<NewSettlement> {
    let mut errors = Vec::new();

    non_empty(&mut errors, "settlementId", &req.settlement_id);
    non_empty(&mut errors, "pts", &req.pts);
    non_empty(&mut errors, "processingEntity", &req.processing_entity);
    non_empty(&mut errors, "counterpartyId", &req.counterparty_id);

    if req.settlement_version < 0 {
        errors.push(FieldError::new("settlementVersion", "must be >= 0"));
    }

    let value_date = NaiveDate::from_str(&req.value_date).ok();
    if value_date.is_none() {
        errors.push(FieldError::new("valueDate", "must be a parseable ISO 8601 date"));
    }

    let currency = req.currency.to_uppercase();
    if !is_iso4217_shape(&currency) {
        errors.push(FieldError::new("currency", "must be a 3-letter ISO 4217 code"));
    }

    let amount = Decimal::from_str(&req.amount).ok();
    match amount {
        Some(a) if a < Decimal::ZERO => {
            errors.push(FieldError::new("amount", "must be >= 0"));
        }
        None => errors.push(FieldError::new("amount", "must be a parseable decimal")),
        _ => {}
    }

    let business_status = BusinessStatus::parse(&req.business_status);
    if business_status.is_none() {
        errors.push(FieldError::new(
            "businessStatus",
            "must be one of PENDING, INVALID, VERIFIED, CANCELLED",
        ));
    }

    let direction = Direction::parse(&req.direction);
    if direction.is_none() {
        errors.push(FieldError::new("direction", "must be one of PAY, RECEIVE"));
    }

    let settlement_type = SettlementType::parse(&req.settlement_type);
    if settlement_type.is_none() {
        errors.push(FieldError::new("settlementType", "must be one of GROSS, NET"));
    }

    if !errors.is_empty() {
        return Err(Error::validation(errors));
    }

    Ok(NewSettlement {
        settlement_id: req.settlement_id.clone(),
        settlement_version: req.settlement_version,
        pts: req.pts.clone(),
        processing_entity: req.processing_entity.clone(),
        counterparty_id: req.counterparty_id.clone(),
        value_date: value_date.expect("checked above"),
        currency,
        amount: amount.expect("checked above"),
        business_status: business_status.expect("checked above"),
        direction: direction.expect("checked above"),
        settlement_type: settlement_type.expect("checked above"),
    })
}
