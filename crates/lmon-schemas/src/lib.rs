//! Shared domain and wire types for the settlement exposure monitor.
//!
//! Every crate in this workspace depends on `lmon-schemas` rather than
//! redefining these shapes locally, the same way the rest of this codebase
//! centralizes cross-crate types in one schemas crate.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod group;
pub use group::GroupKey;

// ---------------------------------------------------------------------------
// Enums stored as text columns — `as_str` / `parse` mirrors how this
// codebase round-trips Postgres text-encoded enums (see RunStatus).
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusinessStatus {
    Pending,
    Invalid,
    Verified,
    Cancelled,
}

impl BusinessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessStatus::Pending => "PENDING",
            BusinessStatus::Invalid => "INVALID",
            BusinessStatus::Verified => "VERIFIED",
            BusinessStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BusinessStatus::Pending),
            "INVALID" => Some(BusinessStatus::Invalid),
            "VERIFIED" => Some(BusinessStatus::Verified),
            "CANCELLED" => Some(BusinessStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Pay,
    Receive,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Pay => "PAY",
            Direction::Receive => "RECEIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAY" => Some(Direction::Pay),
            "RECEIVE" => Some(Direction::Receive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementType {
    Gross,
    Net,
}

impl SettlementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementType::Gross => "GROSS",
            SettlementType::Net => "NET",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GROSS" => Some(SettlementType::Gross),
            "NET" => Some(SettlementType::Net),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityAction {
    RequestRelease,
    Authorise,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::RequestRelease => "REQUEST_RELEASE",
            ActivityAction::Authorise => "AUTHORISE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REQUEST_RELEASE" => Some(ActivityAction::RequestRelease),
            "AUTHORISE" => Some(ActivityAction::Authorise),
            _ => None,
        }
    }
}

/// The four statuses a settlement can derive to. Never persisted — always
/// computed on demand by `lmon-core::status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    Created,
    Authorised,
    PendingAuthorise,
    Blocked,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Created => "CREATED",
            SettlementStatus::Authorised => "AUTHORISED",
            SettlementStatus::PendingAuthorise => "PENDING_AUTHORISE",
            SettlementStatus::Blocked => "BLOCKED",
        }
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// One row of the append-only `SETTLEMENT` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub ref_id: i64,
    pub settlement_id: String,
    pub settlement_version: i64,
    pub pts: String,
    pub processing_entity: String,
    pub counterparty_id: String,
    pub value_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub business_status: BusinessStatus,
    pub direction: Direction,
    pub settlement_type: SettlementType,
    pub is_old: bool,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Settlement {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            pts: self.pts.clone(),
            processing_entity: self.processing_entity.clone(),
            counterparty_id: self.counterparty_id.clone(),
            value_date: self.value_date,
        }
    }
}

/// A new settlement as submitted to `save`, before a `ref_id` is assigned.
#[derive(Debug, Clone)]
pub struct NewSettlement {
    pub settlement_id: String,
    pub settlement_version: i64,
    pub pts: String,
    pub processing_entity: String,
    pub counterparty_id: String,
    pub value_date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub business_status: BusinessStatus,
    pub direction: Direction,
    pub settlement_type: SettlementType,
}

// ---------------------------------------------------------------------------
// Group subtotal
// ---------------------------------------------------------------------------

/// One row of the `RUNNING_TOTAL` table — the materialized subtotal for a
/// `(pts, pe, counterparty_id, value_date)` group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSubtotal {
    pub pts: String,
    pub processing_entity: String,
    pub counterparty_id: String,
    pub value_date: NaiveDate,
    pub running_total: Decimal,
    pub settlement_count: i64,
    pub ref_id: i64,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Calculation rule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRule {
    pub pts: String,
    pub processing_entity: String,
    pub included_business_statuses: Vec<BusinessStatus>,
    pub included_directions: Vec<Direction>,
    pub included_settlement_types: Vec<SettlementType>,
}

impl CalculationRule {
    /// `{PENDING, INVALID, VERIFIED} x {PAY} x {GROSS, NET}` — used whenever
    /// no rule is cached for a `(pts, pe)` key.
    pub fn default_for(pts: impl Into<String>, processing_entity: impl Into<String>) -> Self {
        Self {
            pts: pts.into(),
            processing_entity: processing_entity.into(),
            included_business_statuses: vec![
                BusinessStatus::Pending,
                BusinessStatus::Invalid,
                BusinessStatus::Verified,
            ],
            included_directions: vec![Direction::Pay],
            included_settlement_types: vec![SettlementType::Gross, SettlementType::Net],
        }
    }

    pub fn business_status_codes(&self) -> Vec<&'static str> {
        self.included_business_statuses
            .iter()
            .map(BusinessStatus::as_str)
            .collect()
    }

    pub fn direction_codes(&self) -> Vec<&'static str> {
        self.included_directions.iter().map(Direction::as_str).collect()
    }

    pub fn settlement_type_codes(&self) -> Vec<&'static str> {
        self.included_settlement_types
            .iter()
            .map(SettlementType::as_str)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Activity (approval ledger)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub pts: String,
    pub processing_entity: String,
    pub settlement_id: String,
    pub settlement_version: i64,
    pub user_id: String,
    pub user_name: String,
    pub action: ActivityAction,
    pub comment: Option<String>,
    pub create_time: DateTime<Utc>,
}

/// Read model consumed by the status deriver and query layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub requesters: Vec<String>,
    pub authorisers: Vec<String>,
}

impl WorkflowInfo {
    pub fn has_request_release(&self) -> bool {
        !self.requesters.is_empty()
    }

    pub fn is_authorised(&self) -> bool {
        !self.authorisers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Exchange rate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub currency: String,
    pub rate_to_usd: Decimal,
    pub update_time: DateTime<Utc>,
}
