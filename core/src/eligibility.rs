//! Eligibility engine: which customers each campaign may target.
//!
//! Per (campaign, customer):
//!   p = clip(0.05 + 0.55 · segmentMatch · consent + 0.30 · normPropensity, 0, 0.85)
//!
//! Draw order per customer within a campaign (fixed):
//!   segment jitter → push consent proxy (Push only) → eligibility roll
//!   → overlap roll (only when overlap_rate > 0)

use crate::{
    campaign::Campaign,
    population::Customer,
    rng::StageRng,
    types::{CampaignId, Channel, CustomerId, EligibilityReason},
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const BASE_ELIGIBILITY: f64 = 0.05;
pub const SEGMENT_CONSENT_WEIGHT: f64 = 0.55;
pub const PROPENSITY_WEIGHT: f64 = 0.30;
pub const MAX_ELIGIBILITY: f64 = 0.85;

pub const SEGMENT_JITTER_MEAN: f64 = 0.10;
pub const SEGMENT_JITTER_SD: f64 = 0.10;

/// Consent stand-in for channels with no recorded consent flag.
pub const PUSH_CONSENT_PROXY: f64 = 0.92;

/// Overlap knob scale: forced eligibility is drawn at `overlap_rate * OVERLAP_SCALE`.
pub const OVERLAP_SCALE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRecord {
    pub campaign_id: CampaignId,
    pub customer_id: CustomerId,
    pub eligible_flag: bool,
    pub eligibility_reason: EligibilityReason,
    pub snapshot_date: NaiveDate,
}

/// Min-max normalise baseline propensity across the whole population.
pub fn normalized_propensity(customers: &[Customer]) -> Vec<f64> {
    let (min, max) = customers.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
        (lo.min(c.baseline_buy_prob_daily), hi.max(c.baseline_buy_prob_daily))
    });
    customers
        .iter()
        .map(|c| (c.baseline_buy_prob_daily - min) / (max - min + 1e-9))
        .collect()
}

pub fn eligibility_probability(segment_match: f64, consent: f64, norm_propensity: f64) -> f64 {
    (BASE_ELIGIBILITY
        + SEGMENT_CONSENT_WEIGHT * segment_match * consent
        + PROPENSITY_WEIGHT * norm_propensity)
        .clamp(0.0, MAX_ELIGIBILITY)
}

/// One record per (campaign, customer), campaigns outermost.
pub fn compute_eligibility(
    customers: &[Customer],
    campaigns: &[Campaign],
    overlap_rate: f64,
    rng: &mut StageRng,
) -> Vec<EligibilityRecord> {
    let norm = normalized_propensity(customers);
    let mut records = Vec::with_capacity(customers.len() * campaigns.len());

    for campaign in campaigns {
        let snapshot_date = campaign.start_date - Duration::days(1);
        let mut eligible_count = 0usize;

        for (customer, &norm_propensity) in customers.iter().zip(&norm) {
            let indicator = if customer.lifecycle == campaign.target_segment { 1.0 } else { 0.0 };
            let segment_match = (indicator + rng.normal(SEGMENT_JITTER_MEAN, SEGMENT_JITTER_SD))
                .clamp(0.0, 1.0);

            let consent = match customer.consent_for(campaign.channel) {
                Some(flag) => flag,
                None => {
                    debug_assert_eq!(campaign.channel, Channel::Push);
                    rng.chance(PUSH_CONSENT_PROXY)
                }
            };
            let consent = if consent { 1.0 } else { 0.0 };

            let p = eligibility_probability(segment_match, consent, norm_propensity);
            let mut eligible_flag = rng.chance(p);
            if overlap_rate > 0.0 && rng.chance(overlap_rate * OVERLAP_SCALE) {
                eligible_flag = true;
            }
            if eligible_flag {
                eligible_count += 1;
            }

            records.push(EligibilityRecord {
                campaign_id: campaign.campaign_id.clone(),
                customer_id: customer.customer_id,
                eligible_flag,
                eligibility_reason: if eligible_flag {
                    EligibilityReason::RulesPass
                } else {
                    EligibilityReason::RulesFail
                },
                snapshot_date,
            });
        }

        log::debug!(
            "eligibility: {} → {eligible_count}/{} eligible",
            campaign.campaign_id,
            customers.len()
        );
    }

    log::info!("eligibility: {} records", records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Lifecycle, LoyaltyTier, Region};

    fn feb(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
    }

    /// Identical customers with no recorded consent: normalised propensity is 0.
    fn unconsented(n: u32, lifecycle: Lifecycle) -> Vec<Customer> {
        (1..=n)
            .map(|id| Customer {
                customer_id: id,
                signup_date: feb(1) - Duration::days(200),
                tenure_days: 200,
                loyalty_tier: LoyaltyTier::Bronze,
                region: Region::South,
                channel_pref: Channel::Push,
                consent_email: false,
                consent_sms: false,
                baseline_buy_prob_daily: 0.01,
                lifecycle,
            })
            .collect()
    }

    fn campaign(channel: Channel, target_segment: Lifecycle) -> Campaign {
        Campaign {
            campaign_id: "C001".into(),
            campaign_name: "Campaign 1".into(),
            start_date: feb(10),
            end_date: feb(12),
            channel,
            target_segment,
            attribution_window_days: 7,
            holdout_pct: 0.2,
            true_rpc_uplift: 0.1,
        }
    }

    fn eligible_share(records: &[EligibilityRecord]) -> f64 {
        records.iter().filter(|r| r.eligible_flag).count() as f64 / records.len() as f64
    }

    #[test]
    fn probability_is_capped() {
        assert_eq!(eligibility_probability(1.0, 1.0, 1.0), MAX_ELIGIBILITY);
        assert!((eligibility_probability(0.0, 1.0, 0.0) - BASE_ELIGIBILITY).abs() < 1e-12);
        assert!((eligibility_probability(1.0, 0.0, 0.5) - 0.20).abs() < 1e-12);
    }

    #[test]
    fn overlap_forces_extra_eligibility() {
        let customers = unconsented(20_000, Lifecycle::Lapsed);
        let campaigns = vec![campaign(Channel::Email, Lifecycle::Active)];

        let base = compute_eligibility(&customers, &campaigns, 0.0, &mut StageRng::new(11, 2));
        let overlapped = compute_eligibility(&customers, &campaigns, 1.0, &mut StageRng::new(11, 2));

        // 0.05 alone, then 1 - 0.95² with the forced roll.
        let base_share = eligible_share(&base);
        let overlap_share = eligible_share(&overlapped);
        assert!((base_share - 0.05).abs() < 0.01, "base share {base_share}");
        assert!((overlap_share - 0.0975).abs() < 0.01, "overlap share {overlap_share}");
        assert!(overlapped
            .iter()
            .all(|r| (r.eligibility_reason == EligibilityReason::RulesPass) == r.eligible_flag));
    }

    #[test]
    fn push_uses_the_consent_proxy() {
        let customers = unconsented(20_000, Lifecycle::Warm);
        let push = compute_eligibility(
            &customers,
            &[campaign(Channel::Push, Lifecycle::Warm)],
            0.0,
            &mut StageRng::new(5, 2),
        );
        let sms = compute_eligibility(
            &customers,
            &[campaign(Channel::Sms, Lifecycle::Warm)],
            0.0,
            &mut StageRng::new(5, 2),
        );

        // Push: about 0.92 · 0.60 + 0.08 · 0.05. SMS without consent: the 0.05 floor.
        let push_share = eligible_share(&push);
        let sms_share = eligible_share(&sms);
        assert!((0.50..0.61).contains(&push_share), "push share {push_share}");
        assert!((sms_share - 0.05).abs() < 0.01, "sms share {sms_share}");
        assert_eq!(push[0].snapshot_date, feb(9));
    }
}
