//! Campaign generator: campaign definitions with a hidden ground-truth uplift.
//!
//! `true_rpc_uplift` exists only to drive the transaction simulation.
//! Nothing downstream of the transaction stage may read it.

use crate::{
    calendar::{send_time, Horizon},
    config::SimConfig,
    error::{SimError, SimResult},
    rng::StageRng,
    types::{CampaignId, Channel, Lifecycle},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Days after the horizon start before the first campaign may launch.
pub const LEAD_IN_DAYS: i64 = 5;
/// Days before the horizon end after which no campaign may launch.
pub const TRAILING_BUFFER_DAYS: i64 = 25;
pub const CAMPAIGN_LENGTH_DAYS: i64 = 2;

pub const UPLIFT_MEAN: f64 = 0.18;
pub const UPLIFT_SD: f64 = 0.22;

/// Forced ground truth for the first six campaigns:
/// strong, moderate, near-zero, zero, negative, moderate.
pub const SCENARIO_LADDER: [f64; 6] = [0.45, 0.25, 0.05, 0.00, -0.12, 0.15];

const CHANNEL_WEIGHTS: [(Channel, f64); 3] = [
    (Channel::Email, 0.60),
    (Channel::Sms, 0.25),
    (Channel::Push, 0.15),
];

const TARGET_SEGMENT_WEIGHTS: [(Lifecycle, f64); 4] = [
    (Lifecycle::New, 0.18),
    (Lifecycle::Active, 0.38),
    (Lifecycle::Warm, 0.24),
    (Lifecycle::Lapsed, 0.20),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub campaign_id: CampaignId,
    pub campaign_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub channel: Channel,
    pub target_segment: Lifecycle,
    pub attribution_window_days: u32,
    pub holdout_pct: f64,
    pub true_rpc_uplift: f64,
}

impl Campaign {
    /// Send time, and the anchor for anyone who was not delivered.
    pub fn send_time(&self) -> NaiveDateTime {
        send_time(self.start_date)
    }
}

/// Every day a campaign may start on.
pub fn candidate_start_dates(horizon: &Horizon) -> Vec<NaiveDate> {
    let first = horizon.start + Duration::days(LEAD_IN_DAYS);
    let last = horizon.end - Duration::days(TRAILING_BUFFER_DAYS);
    let mut dates = Vec::new();
    let mut day = first;
    while day <= last {
        dates.push(day);
        day += Duration::days(1);
    }
    dates
}

/// Draw the campaign roster.
///
/// Draw order: start dates (without replacement) → channels → target
/// segments → ground-truth uplifts.
pub fn generate_campaigns(config: &SimConfig, rng: &mut StageRng) -> SimResult<Vec<Campaign>> {
    let n = config.simulation.n_campaigns;
    let horizon = config.horizon()?;

    let mut pool = candidate_start_dates(&horizon);
    if n > pool.len() {
        return Err(SimError::InvalidConfig(format!(
            "{n} campaigns requested but only {} distinct start days are available",
            pool.len()
        )));
    }
    // Partial Fisher-Yates: the first n slots become the sample.
    for i in 0..n {
        let j = i + rng.next_u64_below((pool.len() - i) as u64) as usize;
        pool.swap(i, j);
    }
    pool.truncate(n);
    pool.sort();

    let channels: Vec<Channel> = (0..n).map(|_| rng.pick(&CHANNEL_WEIGHTS)).collect();
    let segments: Vec<Lifecycle> = (0..n).map(|_| rng.pick(&TARGET_SEGMENT_WEIGHTS)).collect();
    let mut uplifts: Vec<f64> = (0..n).map(|_| rng.normal(UPLIFT_MEAN, UPLIFT_SD)).collect();
    if n >= SCENARIO_LADDER.len() {
        uplifts[..SCENARIO_LADDER.len()].copy_from_slice(&SCENARIO_LADDER);
    }

    let window_days = config.campaign_design.default_attribution_window_days;
    let holdout_pct = config.campaign_design.holdout_pct;

    let campaigns: Vec<Campaign> = pool
        .into_iter()
        .enumerate()
        .map(|(i, start_date)| Campaign {
            campaign_id: format!("C{:03}", i + 1),
            campaign_name: format!("Campaign {}", i + 1),
            start_date,
            end_date: start_date + Duration::days(CAMPAIGN_LENGTH_DAYS),
            channel: channels[i],
            target_segment: segments[i],
            attribution_window_days: window_days,
            holdout_pct,
            true_rpc_uplift: uplifts[i],
        })
        .collect();

    log::info!("campaign: generated {} campaigns", campaigns.len());
    Ok(campaigns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, StageSlot};

    #[test]
    fn candidate_dates_respect_buffers() {
        let cfg = SimConfig::default();
        let dates = candidate_start_dates(&cfg.horizon().unwrap());
        assert_eq!(dates.first(), NaiveDate::from_ymd_opt(2024, 1, 6).as_ref());
        assert_eq!(dates.last(), NaiveDate::from_ymd_opt(2024, 3, 6).as_ref());
        assert_eq!(dates.len() as i64, cfg.campaign_start_slots());
    }

    #[test]
    fn ladder_overrides_first_six_uplifts() {
        let cfg = SimConfig::default_test();
        let mut rng = RngBank::new(3).for_stage(StageSlot::Campaign);
        let campaigns = generate_campaigns(&cfg, &mut rng).unwrap();
        let uplifts: Vec<f64> = campaigns.iter().take(6).map(|c| c.true_rpc_uplift).collect();
        assert_eq!(uplifts, SCENARIO_LADDER.to_vec());
    }

    #[test]
    fn short_roster_keeps_sampled_uplifts() {
        let mut cfg = SimConfig::default_test();
        cfg.simulation.n_campaigns = 3;
        let mut rng = RngBank::new(3).for_stage(StageSlot::Campaign);
        let campaigns = generate_campaigns(&cfg, &mut rng).unwrap();
        assert_eq!(campaigns.len(), 3);
        assert_ne!(campaigns[0].true_rpc_uplift, SCENARIO_LADDER[0]);
    }
}
