//! Outcome aggregator: one record per (campaign, eligible customer) with
//! in-window conversion and revenue.
//!
//! Anchor: delivery timestamp if exposed, else campaign start + 9h.
//! Window: [anchor, anchor + window_days), half-open.
//! An eligible customer with no exposure row counts as an undelivered control.

use crate::{
    campaign::Campaign,
    eligibility::EligibilityRecord,
    error::{SimError, SimResult},
    exposure::ExposureRecord,
    population::Customer,
    transaction::Transaction,
    types::{CampaignId, CustomerId, Lifecycle, LoyaltyTier, Region},
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub campaign_id: CampaignId,
    pub customer_id: CustomerId,
    pub exposed_flag: bool,
    pub holdout_flag: bool,
    pub delivered_flag: bool,
    pub control_flag: bool,
    pub bounce_flag: bool,
    pub anchor_ts: NaiveDateTime,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub window_days: u32,
    pub converted_flag: bool,
    pub revenue_in_window: f64,
    pub txn_count_in_window: u32,
    pub lifecycle: Lifecycle,
    pub loyalty_tier: LoyaltyTier,
    pub region: Region,
    pub baseline_buy_prob_daily: f64,
    pub segment_name: String,
}

/// Each customer's transactions as (timestamp, revenue), sorted by timestamp.
#[derive(Debug, Default)]
pub struct TransactionIndex {
    by_customer: HashMap<CustomerId, Vec<(NaiveDateTime, f64)>>,
}

impl TransactionIndex {
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut by_customer: HashMap<CustomerId, Vec<(NaiveDateTime, f64)>> = HashMap::new();
        for txn in transactions {
            by_customer
                .entry(txn.customer_id)
                .or_default()
                .push((txn.txn_ts, txn.gross_revenue));
        }
        // Stable sort keeps generation order for equal timestamps, so sums are reproducible.
        for rows in by_customer.values_mut() {
            rows.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Self { by_customer }
    }

    /// Revenue and count of a customer's transactions with start ≤ ts < end.
    pub fn window_totals(
        &self,
        customer_id: CustomerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> (f64, u32) {
        let Some(rows) = self.by_customer.get(&customer_id) else {
            return (0.0, 0);
        };
        let lo = rows.partition_point(|(ts, _)| *ts < start);
        let hi = rows.partition_point(|(ts, _)| *ts < end);
        if hi <= lo {
            return (0.0, 0);
        }
        let in_window = &rows[lo..hi];
        (in_window.iter().map(|(_, rev)| rev).sum(), in_window.len() as u32)
    }
}

pub fn aggregate_outcomes(
    customers: &[Customer],
    campaigns: &[Campaign],
    eligibility: &[EligibilityRecord],
    exposure: &[ExposureRecord],
    transactions: &[Transaction],
) -> SimResult<Vec<OutcomeRecord>> {
    let customer_by_id: HashMap<CustomerId, &Customer> =
        customers.iter().map(|c| (c.customer_id, c)).collect();
    let campaign_by_id: HashMap<&str, &Campaign> =
        campaigns.iter().map(|c| (c.campaign_id.as_str(), c)).collect();
    let exposure_by_key: HashMap<(&str, CustomerId), &ExposureRecord> = exposure
        .iter()
        .map(|e| ((e.campaign_id.as_str(), e.customer_id), e))
        .collect();
    let index = TransactionIndex::build(transactions);

    let mut seen: HashSet<(&str, CustomerId)> = HashSet::new();
    let mut outcomes = Vec::new();

    for record in eligibility.iter().filter(|r| r.eligible_flag) {
        let key = (record.campaign_id.as_str(), record.customer_id);
        if !seen.insert(key) {
            continue;
        }
        let campaign = campaign_by_id
            .get(record.campaign_id.as_str())
            .ok_or_else(|| SimError::DanglingReference {
                table: "fact_eligibility",
                key: record.campaign_id.clone(),
            })?;
        let customer = customer_by_id
            .get(&record.customer_id)
            .ok_or_else(|| SimError::DanglingReference {
                table: "fact_eligibility",
                key: record.customer_id.to_string(),
            })?;

        let fallback;
        let exp = match exposure_by_key.get(&key) {
            Some(e) => *e,
            None => {
                fallback = ExposureRecord::missing(&record.campaign_id, record.customer_id);
                &fallback
            }
        };

        let anchor_ts = match (exp.delivered_flag, exp.delivered_ts) {
            (true, Some(ts)) => ts,
            _ => campaign.send_time(),
        };
        let window_days = campaign.attribution_window_days;
        let window_end = anchor_ts + Duration::days(window_days as i64);
        let (revenue_in_window, txn_count_in_window) =
            index.window_totals(customer.customer_id, anchor_ts, window_end);

        outcomes.push(OutcomeRecord {
            campaign_id: record.campaign_id.clone(),
            customer_id: record.customer_id,
            exposed_flag: exp.is_exposed(),
            holdout_flag: exp.is_holdout(),
            delivered_flag: exp.delivered_flag,
            control_flag: exp.control_flag,
            bounce_flag: exp.bounce_flag,
            anchor_ts,
            window_start: anchor_ts,
            window_end,
            window_days,
            converted_flag: txn_count_in_window > 0,
            revenue_in_window,
            txn_count_in_window,
            lifecycle: customer.lifecycle,
            loyalty_tier: customer.loyalty_tier,
            region: customer.region,
            baseline_buy_prob_daily: customer.baseline_buy_prob_daily,
            segment_name: customer.segment_name(),
        });
    }

    log::info!("outcome: {} campaign-customer outcomes", outcomes.len());
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn txn(id: u64, customer_id: CustomerId, at: NaiveDateTime, revenue: f64) -> Transaction {
        Transaction {
            txn_id: format!("T{id:010}"),
            customer_id,
            txn_ts: at,
            store_id: 1,
            channel: crate::types::SalesChannel::Store,
            gross_revenue: revenue,
            items_count: 1,
        }
    }

    #[test]
    fn window_is_half_open() {
        let index = TransactionIndex::build(&[
            txn(1, 7, ts(10, 8, 59), 5.0),  // before anchor
            txn(2, 7, ts(10, 9, 0), 10.0),  // exactly at start: in
            txn(3, 7, ts(16, 20, 0), 20.0), // inside
            txn(4, 7, ts(17, 9, 0), 40.0),  // exactly at end: out
        ]);
        let (revenue, count) = index.window_totals(7, ts(10, 9, 0), ts(17, 9, 0));
        assert_eq!(count, 2);
        assert!((revenue - 30.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_customer_has_empty_window() {
        let index = TransactionIndex::build(&[]);
        assert_eq!(index.window_totals(1, ts(1, 0, 0), ts(8, 0, 0)), (0.0, 0));
    }
}
