//! The status deriver: a pure function of `(settlement, group subtotal,
//! exposure limit, workflow info)`. Status is never stored.

use rust_decimal::Decimal;

use lmon_schemas::{BusinessStatus, Direction, Settlement, SettlementStatus, WorkflowInfo};

/// Derives the on-demand status:
///
/// ```text
/// if direction = RECEIVE or business_status = CANCELLED: CREATED
/// else if running_total <= exposure_limit(cp): CREATED
/// else if is_authorised: AUTHORISED
/// else if has_request_release: PENDING_AUTHORISE
/// else if direction = PAY and business_status = VERIFIED: BLOCKED
/// else: CREATED
/// ```
pub fn derive(
    settlement: &Settlement,
    running_total: Decimal,
    exposure_limit: Decimal,
    workflow: &WorkflowInfo,
) -> SettlementStatus {
    if settlement.direction == Direction::Receive || settlement.business_status == BusinessStatus::Cancelled {
        return SettlementStatus::Created;
    }

    if running_total <= exposure_limit {
        return SettlementStatus::Created;
    }

    if workflow.is_authorised() {
        return SettlementStatus::Authorised;
    }

    if workflow.has_request_release() {
        return SettlementStatus::PendingAuthorise;
    }

    if settlement.direction == Direction::Pay && settlement.business_status == BusinessStatus::Verified {
        return SettlementStatus::Blocked;
    }

    SettlementStatus::Created
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use lmon_schemas::SettlementType;
    use std::str::FromStr;

    fn base_settlement() -> Settlement {
        Settlement {
            ref_id: 1,
            settlement_id: "S1".into(),
            settlement_version: 1,
            pts: "PTS1".into(),
            processing_entity: "PE1".into(),
            counterparty_id: "CP1".into(),
            value_date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            currency: "USD".into(),
            amount: Decimal::from_str("600000000.00").unwrap(),
            business_status: BusinessStatus::Verified,
            direction: Direction::Pay,
            settlement_type: SettlementType::Gross,
            is_old: false,
            create_time: Utc::now(),
            update_time: Utc::now(),
        }
    }

    fn limit() -> Decimal {
        Decimal::from_str("500000000.00").unwrap()
    }

    #[test]
    fn receive_direction_is_always_created() {
        let mut s = base_settlement();
        s.direction = Direction::Receive;
        let status = derive(&s, Decimal::from_str("900000000.00").unwrap(), limit(), &WorkflowInfo::default());
        assert_eq!(status, SettlementStatus::Created);
    }

    #[test]
    fn cancelled_is_always_created() {
        let mut s = base_settlement();
        s.business_status = BusinessStatus::Cancelled;
        let status = derive(&s, Decimal::from_str("900000000.00").unwrap(), limit(), &WorkflowInfo::default());
        assert_eq!(status, SettlementStatus::Created);
    }

    #[test]
    fn under_limit_is_created() {
        let s = base_settlement();
        let status = derive(&s, Decimal::from_str("100000000.00").unwrap(), limit(), &WorkflowInfo::default());
        assert_eq!(status, SettlementStatus::Created);
    }

    #[test]
    fn over_limit_pay_verified_no_approvals_is_blocked() {
        let s = base_settlement();
        let status = derive(&s, Decimal::from_str("600000000.00").unwrap(), limit(), &WorkflowInfo::default());
        assert_eq!(status, SettlementStatus::Blocked);
    }

    #[test]
    fn over_limit_with_request_release_is_pending_authorise() {
        let s = base_settlement();
        let workflow = WorkflowInfo {
            requesters: vec!["U1".into()],
            authorisers: vec![],
        };
        let status = derive(&s, Decimal::from_str("600000000.00").unwrap(), limit(), &workflow);
        assert_eq!(status, SettlementStatus::PendingAuthorise);
    }

    #[test]
    fn over_limit_with_authorise_is_authorised() {
        let s = base_settlement();
        let workflow = WorkflowInfo {
            requesters: vec!["U1".into()],
            authorisers: vec!["U2".into()],
        };
        let status = derive(&s, Decimal::from_str("600000000.00").unwrap(), limit(), &workflow);
        assert_eq!(status, SettlementStatus::Authorised);
    }

    #[test]
    fn over_limit_pending_business_status_is_created() {
        let mut s = base_settlement();
        s.business_status = BusinessStatus::Pending;
        let status = derive(&s, Decimal::from_str("600000000.00").unwrap(), limit(), &WorkflowInfo::default());
        assert_eq!(status, SettlementStatus::Created);
    }
}
