//! Exposure simulator: splits each campaign's eligible customers into
//! delivered sends and holdout/bounced non-deliveries.
//!
//! Draw order per eligible customer (fixed):
//!   holdout roll → bounce roll (non-holdout only) → send jitter (delivered only)

use crate::{
    campaign::Campaign,
    eligibility::EligibilityRecord,
    rng::StageRng,
    types::{CampaignId, CustomerId},
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Delivery lands uniformly within this many minutes after the send time.
pub const SEND_JITTER_MINUTES: i64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureRecord {
    pub campaign_id: CampaignId,
    pub customer_id: CustomerId,
    pub send_id: String,
    pub delivered_flag: bool,
    pub delivered_ts: Option<NaiveDateTime>,
    pub bounce_flag: bool,
    pub control_flag: bool,
}

impl ExposureRecord {
    /// The default for an eligible customer with no exposure row: an undelivered control.
    pub fn missing(campaign_id: &str, customer_id: CustomerId) -> Self {
        Self {
            campaign_id: campaign_id.to_string(),
            customer_id,
            send_id: String::new(),
            delivered_flag: false,
            delivered_ts: None,
            bounce_flag: false,
            control_flag: true,
        }
    }

    pub fn is_exposed(&self) -> bool {
        self.delivered_flag
    }

    pub fn is_holdout(&self) -> bool {
        self.control_flag || !self.delivered_flag
    }
}

/// Eligible customer ids per campaign, preserving eligibility order.
pub fn eligible_by_campaign(eligibility: &[EligibilityRecord]) -> HashMap<&str, Vec<CustomerId>> {
    let mut grouped: HashMap<&str, Vec<CustomerId>> = HashMap::new();
    for record in eligibility.iter().filter(|r| r.eligible_flag) {
        grouped
            .entry(record.campaign_id.as_str())
            .or_default()
            .push(record.customer_id);
    }
    grouped
}

pub fn simulate_exposure(
    eligibility: &[EligibilityRecord],
    campaigns: &[Campaign],
    bounce_rate: f64,
    rng: &mut StageRng,
) -> Vec<ExposureRecord> {
    let grouped = eligible_by_campaign(eligibility);
    let mut records = Vec::new();

    for campaign in campaigns {
        let Some(eligible) = grouped.get(campaign.campaign_id.as_str()) else {
            log::warn!("exposure: {} has no eligible customers, skipped", campaign.campaign_id);
            continue;
        };

        let send_ts = campaign.send_time();
        for (i, &customer_id) in eligible.iter().enumerate() {
            let control_flag = rng.chance(campaign.holdout_pct);
            let bounce_flag = !control_flag && rng.chance(bounce_rate);
            let delivered_flag = !control_flag && !bounce_flag;
            let delivered_ts = if delivered_flag {
                let jitter = rng.range_i64(0, SEND_JITTER_MINUTES);
                Some(send_ts + Duration::minutes(jitter))
            } else {
                None
            };

            records.push(ExposureRecord {
                campaign_id: campaign.campaign_id.clone(),
                customer_id,
                send_id: format!("{}_S{:07}", campaign.campaign_id, i + 1),
                delivered_flag,
                delivered_ts,
                bounce_flag,
                control_flag,
            });
        }
    }

    log::info!("exposure: {} sends recorded", records.len());
    records
}

/// Campaigns that produced no exposure rows at all.
pub fn unexposed_campaigns<'a>(campaigns: &'a [Campaign], exposure: &[ExposureRecord]) -> Vec<&'a str> {
    let exposed: HashSet<&str> = exposure.iter().map(|e| e.campaign_id.as_str()).collect();
    campaigns
        .iter()
        .map(|c| c.campaign_id.as_str())
        .filter(|id| !exposed.contains(id))
        .collect()
}
