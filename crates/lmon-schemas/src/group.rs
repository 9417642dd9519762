use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The tuple `(pts, processing_entity, counterparty_id, value_date)` that
/// identifies one exposure group and its materialized subtotal row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub pts: String,
    pub processing_entity: String,
    pub counterparty_id: String,
    pub value_date: NaiveDate,
}

impl GroupKey {
    pub fn new(
        pts: impl Into<String>,
        processing_entity: impl Into<String>,
        counterparty_id: impl Into<String>,
        value_date: NaiveDate,
    ) -> Self {
        Self {
            pts: pts.into(),
            processing_entity: processing_entity.into(),
            counterparty_id: counterparty_id.into(),
            value_date,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.pts, self.processing_entity, self.counterparty_id, self.value_date
        )
    }
}
