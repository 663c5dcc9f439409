//! Transaction simulator: daily purchases with time-windowed campaign uplift.
//!
//! For every calendar day d and customer c:
//!   p = clip(baseline(c) · weekday(d) + Σ upliftTerm(k), 0, 0.35)
//! summed over campaigns k delivered to c with
//!   deliveryDate ≤ d < deliveryDate + windowDays.
//!
//! Delivery windows are resolved once into per-customer day-index ranges,
//! so the daily loop only touches static arrays.
//!
//! Draw order (fixed): days outermost, customers in population order;
//! per customer: purchase roll, then for buyers the second-txn roll and,
//! per transaction, revenue → item noise → store → channel → minute.

use crate::{
    calendar::{at_minute, weekday_multiplier, Horizon},
    campaign::Campaign,
    exposure::ExposureRecord,
    population::Customer,
    rng::StageRng,
    types::{CustomerId, LoyaltyTier, SalesChannel},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const UPLIFT_DIVISOR: f64 = 50.0;
pub const UPLIFT_TERM_MIN: f64 = -0.01;
pub const UPLIFT_TERM_MAX: f64 = 0.02;
pub const MAX_DAILY_PURCHASE_PROBABILITY: f64 = 0.35;

pub const SECOND_TXN_PROBABILITY: f64 = 0.12;

pub const REVENUE_LOG_MEAN: f64 = 2.85;
pub const REVENUE_LOG_SIGMA: f64 = 0.55;
pub const REVENUE_PER_ITEM: f64 = 8.5;
pub const ITEMS_MIN: i64 = 1;
pub const ITEMS_MAX: i64 = 40;

pub const STORE_ID_MIN: i64 = 1;
pub const STORE_ID_MAX: i64 = 120; // exclusive

/// Shopping hours: 08:00 up to (not including) 21:00.
pub const OPEN_MINUTE: i64 = 8 * 60;
pub const CLOSE_MINUTE: i64 = 21 * 60;

const SALES_CHANNEL_WEIGHTS: [(SalesChannel, f64); 2] =
    [(SalesChannel::Store, 0.78), (SalesChannel::Online, 0.22)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub txn_id: String,
    pub customer_id: CustomerId,
    pub txn_ts: NaiveDateTime,
    pub store_id: u32,
    pub channel: SalesChannel,
    pub gross_revenue: f64,
    pub items_count: u32,
}

/// Daily purchase-probability increment for a campaign's ground-truth uplift.
pub fn uplift_term(true_rpc_uplift: f64) -> f64 {
    (true_rpc_uplift / UPLIFT_DIVISOR).clamp(UPLIFT_TERM_MIN, UPLIFT_TERM_MAX)
}

pub fn revenue_tier_scale(tier: LoyaltyTier) -> f64 {
    match tier {
        LoyaltyTier::Bronze => 1.00,
        LoyaltyTier::Silver => 1.15,
        LoyaltyTier::Gold => 1.35,
        LoyaltyTier::Platinum => 1.55,
    }
}

/// Purchase probability for one customer-day, clipped to `[0, 0.35]`.
pub fn daily_purchase_probability(baseline: f64, weekday: f64, uplift: f64) -> f64 {
    (baseline * weekday + uplift).clamp(0.0, MAX_DAILY_PURCHASE_PROBABILITY)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A half-open range of horizon day indices during which a delivered
/// campaign lifts one customer's purchase probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveWindow {
    pub first_day: usize,
    pub end_day: usize,
    pub term: f64,
}

/// Per-customer active campaign windows, indexed by population position.
#[derive(Debug, Clone, Default)]
pub struct DeliveryWindows {
    per_customer: Vec<Vec<ActiveWindow>>,
}

impl DeliveryWindows {
    pub fn build(
        customers: &[Customer],
        campaigns: &[Campaign],
        exposure: &[ExposureRecord],
        horizon: &Horizon,
    ) -> Self {
        let position: HashMap<CustomerId, usize> = customers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.customer_id, i))
            .collect();
        let campaign_by_id: HashMap<&str, &Campaign> =
            campaigns.iter().map(|c| (c.campaign_id.as_str(), c)).collect();

        let horizon_days = horizon.len_days() as i64;
        let mut per_customer = vec![Vec::new(); customers.len()];

        for record in exposure {
            let Some(ts) = record.delivered_ts.filter(|_| record.delivered_flag) else {
                continue;
            };
            let (Some(&idx), Some(campaign)) = (
                position.get(&record.customer_id),
                campaign_by_id.get(record.campaign_id.as_str()),
            ) else {
                continue;
            };
            let term = uplift_term(campaign.true_rpc_uplift);
            if term == 0.0 {
                continue;
            }

            let first = horizon.offset_of(ts.date());
            let end = first + campaign.attribution_window_days as i64;
            let first = first.clamp(0, horizon_days);
            let end = end.clamp(0, horizon_days);
            if first >= end {
                continue;
            }
            per_customer[idx].push(ActiveWindow {
                first_day: first as usize,
                end_day: end as usize,
                term,
            });
        }

        Self { per_customer }
    }

    /// Summed uplift term for the customer at `position` on `day`.
    pub fn uplift_on(&self, position: usize, day: usize) -> f64 {
        self.per_customer
            .get(position)
            .map(|windows| {
                windows
                    .iter()
                    .filter(|w| w.first_day <= day && day < w.end_day)
                    .map(|w| w.term)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    pub fn windows_for(&self, position: usize) -> &[ActiveWindow] {
        self.per_customer.get(position).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub fn simulate_transactions(
    customers: &[Customer],
    campaigns: &[Campaign],
    exposure: &[ExposureRecord],
    horizon: &Horizon,
    rng: &mut StageRng,
) -> Vec<Transaction> {
    let windows = DeliveryWindows::build(customers, campaigns, exposure, horizon);
    let baseline: Vec<f64> = customers.iter().map(|c| c.baseline_buy_prob_daily).collect();
    let tier_scale: Vec<f64> = customers
        .iter()
        .map(|c| revenue_tier_scale(c.loyalty_tier))
        .collect();

    let mut transactions = Vec::new();
    let mut next_txn = 1u64;
    let mut daily_p = vec![0.0; customers.len()];

    for (day, date) in horizon.days().enumerate() {
        let weekday = weekday_multiplier(date);
        for (i, p) in daily_p.iter_mut().enumerate() {
            *p = daily_purchase_probability(baseline[i], weekday, windows.uplift_on(i, day));
        }

        let before = transactions.len();
        for (i, customer) in customers.iter().enumerate() {
            if !rng.chance(daily_p[i]) {
                continue;
            }
            let n_txn = if rng.chance(SECOND_TXN_PROBABILITY) { 2 } else { 1 };
            for _ in 0..n_txn {
                let revenue = rng.log_normal(REVENUE_LOG_MEAN, REVENUE_LOG_SIGMA) * tier_scale[i];
                let items = (revenue / REVENUE_PER_ITEM + rng.normal(0.0, 1.0))
                    .round()
                    .clamp(ITEMS_MIN as f64, ITEMS_MAX as f64) as u32;
                let store_id = rng.range_i64(STORE_ID_MIN, STORE_ID_MAX) as u32;
                let channel = rng.pick(&SALES_CHANNEL_WEIGHTS);
                let minute = rng.range_i64(OPEN_MINUTE, CLOSE_MINUTE);

                transactions.push(Transaction {
                    txn_id: format!("T{next_txn:010}"),
                    customer_id: customer.customer_id,
                    txn_ts: at_minute(date, minute),
                    store_id,
                    channel,
                    gross_revenue: round_cents(revenue),
                    items_count: items,
                });
                next_txn += 1;
            }
        }
        log::debug!("transaction: {date} → {} txns", transactions.len() - before);
    }

    log::info!(
        "transaction: {} txns over {} days for {} customers",
        transactions.len(),
        horizon.len_days(),
        customers.len()
    );
    transactions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Channel, Lifecycle, Region};
    use chrono::NaiveDate;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn horizon() -> Horizon {
        Horizon::new(jan(1), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()).unwrap()
    }

    fn customer(id: CustomerId) -> Customer {
        Customer {
            customer_id: id,
            signup_date: jan(1) - chrono::Duration::days(300),
            tenure_days: 300,
            loyalty_tier: LoyaltyTier::Silver,
            region: Region::West,
            channel_pref: Channel::Email,
            consent_email: true,
            consent_sms: true,
            baseline_buy_prob_daily: 0.01,
            lifecycle: Lifecycle::Active,
        }
    }

    fn campaign(id: &str, true_rpc_uplift: f64) -> Campaign {
        Campaign {
            campaign_id: id.into(),
            campaign_name: format!("Campaign {id}"),
            start_date: jan(10),
            end_date: jan(12),
            channel: Channel::Email,
            target_segment: Lifecycle::Active,
            attribution_window_days: 7,
            holdout_pct: 0.2,
            true_rpc_uplift,
        }
    }

    fn send(campaign_id: &str, customer_id: CustomerId, ts: Option<NaiveDateTime>) -> ExposureRecord {
        ExposureRecord {
            campaign_id: campaign_id.into(),
            customer_id,
            send_id: format!("{campaign_id}_S{customer_id:07}"),
            delivered_flag: ts.is_some(),
            delivered_ts: ts,
            bounce_flag: false,
            control_flag: ts.is_none(),
        }
    }

    #[test]
    fn uplift_applies_only_inside_the_delivery_window() {
        let customers = vec![customer(1)];
        let campaigns = vec![campaign("C001", 0.45), campaign("C002", 0.25)];
        let ts = jan(10).and_hms_opt(10, 59, 0).unwrap();
        let exposure = vec![send("C001", 1, Some(ts)), send("C002", 1, Some(ts))];

        let windows = DeliveryWindows::build(&customers, &campaigns, &exposure, &horizon());
        assert_eq!(windows.windows_for(0).len(), 2);
        assert_eq!(windows.windows_for(0)[0].first_day, 9);
        assert_eq!(windows.windows_for(0)[0].end_day, 16);

        assert_eq!(windows.uplift_on(0, 8), 0.0, "day before delivery");
        for day in 9..=15 {
            assert!(
                (windows.uplift_on(0, day) - 0.014).abs() < 1e-12,
                "day {day}: {}",
                windows.uplift_on(0, day)
            );
        }
        assert_eq!(windows.uplift_on(0, 16), 0.0, "window end is exclusive");
    }

    #[test]
    fn late_evening_delivery_still_starts_on_its_own_day() {
        let customers = vec![customer(1)];
        let campaigns = vec![campaign("C001", 0.45)];
        let ts = jan(10).and_hms_opt(23, 59, 0).unwrap();
        let exposure = vec![send("C001", 1, Some(ts))];

        let windows = DeliveryWindows::build(&customers, &campaigns, &exposure, &horizon());
        assert_eq!(windows.uplift_on(0, 8), 0.0);
        assert!((windows.uplift_on(0, 9) - 0.009).abs() < 1e-12);
        assert!((windows.uplift_on(0, 15) - 0.009).abs() < 1e-12);
        assert_eq!(windows.uplift_on(0, 16), 0.0);
    }

    #[test]
    fn window_is_cut_at_the_horizon_end() {
        let customers = vec![customer(1)];
        let campaigns = vec![campaign("C001", 0.45)];
        let ts = NaiveDate::from_ymd_opt(2024, 3, 28).unwrap().and_hms_opt(9, 30, 0).unwrap();
        let exposure = vec![send("C001", 1, Some(ts))];

        let windows = DeliveryWindows::build(&customers, &campaigns, &exposure, &horizon());
        assert_eq!(
            windows.windows_for(0),
            &[ActiveWindow { first_day: 87, end_day: 91, term: uplift_term(0.45) }]
        );
    }

    #[test]
    fn undelivered_customers_get_no_uplift() {
        let customers = vec![customer(1), customer(2), customer(3)];
        let campaigns = vec![campaign("C001", 0.45), campaign("C004", 0.0)];
        let ts = jan(10).and_hms_opt(9, 0, 0).unwrap();
        let mut bounced = send("C001", 2, None);
        bounced.control_flag = false;
        bounced.bounce_flag = true;
        let exposure = vec![
            send("C001", 1, None),
            bounced,
            send("C004", 3, Some(ts)),
        ];

        let windows = DeliveryWindows::build(&customers, &campaigns, &exposure, &horizon());
        for position in 0..3 {
            assert!(windows.windows_for(position).is_empty(), "customer at {position}");
            assert_eq!(windows.uplift_on(position, 10), 0.0);
        }
        assert_eq!(windows.uplift_on(7, 10), 0.0, "unknown position");
    }

    #[test]
    fn daily_probability_is_clipped() {
        assert!((daily_purchase_probability(0.01, 1.15, 0.014) - 0.0255).abs() < 1e-12);
        assert_eq!(daily_purchase_probability(0.30, 1.15, 0.02), MAX_DAILY_PURCHASE_PROBABILITY);
        assert_eq!(daily_purchase_probability(0.002, 1.0, -0.01), 0.0);
    }

    #[test]
    fn uplift_term_is_clipped() {
        assert!((uplift_term(0.45) - 0.009).abs() < 1e-12);
        assert_eq!(uplift_term(0.0), 0.0);
        assert_eq!(uplift_term(5.0), UPLIFT_TERM_MAX);
        assert_eq!(uplift_term(-5.0), UPLIFT_TERM_MIN);
    }

    #[test]
    fn round_cents_keeps_two_decimals() {
        assert_eq!(round_cents(12.3456), 12.35);
        assert_eq!(round_cents(0.004), 0.0);
    }
}
