//! Population generator: a synthetic customer base with latent purchase propensity.
//!
//! Draw order per customer (fixed, never reordered):
//!   tenure → tier → region → channel preference → email consent
//!   → SMS consent → propensity noise → recency score

use crate::{
    rng::StageRng,
    types::{segment_name, Channel, CustomerId, Lifecycle, LoyaltyTier, Region},
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const TENURE_DAYS_MIN: i64 = 30;
pub const TENURE_DAYS_MAX: i64 = 900; // exclusive
pub const NEW_CUSTOMER_TENURE_DAYS: u32 = 90;

pub const BASE_DAILY_PURCHASE_RATE: f64 = 0.012;
pub const PROPENSITY_NOISE_SD: f64 = 0.002;
pub const PROPENSITY_MIN: f64 = 0.002;
pub const PROPENSITY_MAX: f64 = 0.06;

pub const CONSENT_EMAIL_RATE: f64 = 0.86;
pub const CONSENT_SMS_RATE: f64 = 0.58;

const RECENCY_ALPHA: f64 = 2.2;
const RECENCY_BETA: f64 = 3.5;
const ACTIVE_RECENCY: f64 = 0.72;
const WARM_RECENCY: f64 = 0.42;

const TIER_WEIGHTS: [(LoyaltyTier, f64); 4] = [
    (LoyaltyTier::Bronze, 0.46),
    (LoyaltyTier::Silver, 0.32),
    (LoyaltyTier::Gold, 0.18),
    (LoyaltyTier::Platinum, 0.04),
];

const REGION_WEIGHTS: [(Region, f64); 4] = [
    (Region::North, 0.27),
    (Region::South, 0.23),
    (Region::East, 0.26),
    (Region::West, 0.24),
];

const CHANNEL_PREF_WEIGHTS: [(Channel, f64); 3] = [
    (Channel::Email, 0.62),
    (Channel::Sms, 0.23),
    (Channel::Push, 0.15),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub signup_date: NaiveDate,
    pub tenure_days: u32,
    pub loyalty_tier: LoyaltyTier,
    pub region: Region,
    pub channel_pref: Channel,
    pub consent_email: bool,
    pub consent_sms: bool,
    pub baseline_buy_prob_daily: f64,
    pub lifecycle: Lifecycle,
}

impl Customer {
    pub fn segment_name(&self) -> String {
        segment_name(self.lifecycle, self.loyalty_tier)
    }

    /// Explicit consent flag for a channel. Push has no recorded consent.
    pub fn consent_for(&self, channel: Channel) -> Option<bool> {
        match channel {
            Channel::Email => Some(self.consent_email),
            Channel::Sms => Some(self.consent_sms),
            Channel::Push => None,
        }
    }
}

pub fn tier_multiplier(tier: LoyaltyTier) -> f64 {
    match tier {
        LoyaltyTier::Bronze => 0.70,
        LoyaltyTier::Silver => 0.95,
        LoyaltyTier::Gold => 1.25,
        LoyaltyTier::Platinum => 1.45,
    }
}

pub fn region_multiplier(region: Region) -> f64 {
    match region {
        Region::North => 1.05,
        Region::South => 0.95,
        Region::East => 1.00,
        Region::West => 1.02,
    }
}

pub fn tenure_multiplier(tenure_days: u32) -> f64 {
    (0.85 + tenure_days as f64 / 1000.0).clamp(0.85, 1.35)
}

/// Lifecycle from a recency score; short tenure always reads as New.
pub fn lifecycle_for(recency: f64, tenure_days: u32) -> Lifecycle {
    if tenure_days < NEW_CUSTOMER_TENURE_DAYS {
        Lifecycle::New
    } else if recency > ACTIVE_RECENCY {
        Lifecycle::Active
    } else if recency > WARM_RECENCY {
        Lifecycle::Warm
    } else {
        Lifecycle::Lapsed
    }
}

/// Generate `n` customers whose tenure is measured back from `end_date`.
pub fn generate_population(n: usize, end_date: NaiveDate, rng: &mut StageRng) -> Vec<Customer> {
    let mut customers = Vec::with_capacity(n);

    for i in 0..n {
        let tenure_days = rng.range_i64(TENURE_DAYS_MIN, TENURE_DAYS_MAX) as u32;
        let signup_date = end_date - Duration::days(tenure_days as i64);

        let loyalty_tier = rng.pick(&TIER_WEIGHTS);
        let region = rng.pick(&REGION_WEIGHTS);
        let channel_pref = rng.pick(&CHANNEL_PREF_WEIGHTS);
        let consent_email = rng.chance(CONSENT_EMAIL_RATE);
        let consent_sms = rng.chance(CONSENT_SMS_RATE);

        let base = BASE_DAILY_PURCHASE_RATE
            * tier_multiplier(loyalty_tier)
            * region_multiplier(region)
            * tenure_multiplier(tenure_days);
        let baseline_buy_prob_daily =
            (base + rng.normal(0.0, PROPENSITY_NOISE_SD)).clamp(PROPENSITY_MIN, PROPENSITY_MAX);

        let recency = rng.beta(RECENCY_ALPHA, RECENCY_BETA);
        let lifecycle = lifecycle_for(recency, tenure_days);

        customers.push(Customer {
            customer_id: (i + 1) as CustomerId,
            signup_date,
            tenure_days,
            loyalty_tier,
            region,
            channel_pref,
            consent_email,
            consent_sms,
            baseline_buy_prob_daily,
            lifecycle,
        });
    }

    log::info!("population: generated {} customers", customers.len());
    customers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenure_multiplier_is_clipped() {
        assert_eq!(tenure_multiplier(0), 0.85);
        assert!((tenure_multiplier(300) - 1.15).abs() < 1e-12);
        assert_eq!(tenure_multiplier(899), 1.35);
    }

    #[test]
    fn short_tenure_overrides_recency() {
        assert_eq!(lifecycle_for(0.99, 45), Lifecycle::New);
        assert_eq!(lifecycle_for(0.80, 400), Lifecycle::Active);
        assert_eq!(lifecycle_for(0.50, 400), Lifecycle::Warm);
        assert_eq!(lifecycle_for(0.42, 400), Lifecycle::Lapsed);
    }
}
