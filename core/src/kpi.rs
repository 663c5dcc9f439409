//! KPI aggregator: exposed-vs-holdout uplift at campaign and segment grain.
//!
//! One pass over the outcomes feeds ordered maps keyed by campaign and by
//! (campaign, segment); blocks are derived from the accumulated totals.
//! Campaigns with no outcomes produce no row.

use crate::{
    campaign::Campaign,
    error::{SimError, SimResult},
    outcome::OutcomeRecord,
    types::{CampaignId, Channel, CustomerId, Lifecycle, LoyaltyTier, Region},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Conversion and revenue totals for one side of the experiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiBlock {
    pub n_customers: u64,
    pub converters: u64,
    pub revenue: f64,
    pub cr: f64,
    pub rpc: f64,
}

impl KpiBlock {
    /// CR and RPC are 0 for an empty group.
    pub fn from_totals(n_customers: u64, converters: u64, revenue: f64) -> Self {
        let (cr, rpc) = if n_customers > 0 {
            (converters as f64 / n_customers as f64, revenue / n_customers as f64)
        } else {
            (0.0, 0.0)
        };
        Self {
            n_customers,
            converters,
            revenue,
            cr,
            rpc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Uplift {
    pub cr_uplift: f64,
    pub rpc_uplift: f64,
    /// Welch standard error of `rpc_uplift`.
    pub rpc_uplift_std_err: f64,
    pub incremental_revenue: f64,
    pub insufficient_sample_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignKpi {
    pub campaign_id: CampaignId,
    pub campaign_name: String,
    pub start_date: NaiveDate,
    pub channel: Channel,
    pub target_segment: Lifecycle,
    pub attribution_window_days: u32,
    pub exposed: KpiBlock,
    pub holdout: KpiBlock,
    pub uplift: Uplift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentKpi {
    pub campaign_id: CampaignId,
    pub segment_name: String,
    pub exposed: KpiBlock,
    pub holdout: KpiBlock,
    pub uplift: Uplift,
}

/// Slim per-customer extract for distribution checks and lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeLight {
    pub campaign_id: CampaignId,
    pub customer_id: CustomerId,
    pub exposed_flag: bool,
    pub holdout_flag: bool,
    pub converted_flag: bool,
    pub revenue_in_window: f64,
    pub segment_name: String,
    pub lifecycle: Lifecycle,
    pub loyalty_tier: LoyaltyTier,
    pub region: Region,
    pub baseline_buy_prob_daily: f64,
}

impl From<&OutcomeRecord> for OutcomeLight {
    fn from(o: &OutcomeRecord) -> Self {
        Self {
            campaign_id: o.campaign_id.clone(),
            customer_id: o.customer_id,
            exposed_flag: o.exposed_flag,
            holdout_flag: o.holdout_flag,
            converted_flag: o.converted_flag,
            revenue_in_window: o.revenue_in_window,
            segment_name: o.segment_name.clone(),
            lifecycle: o.lifecycle,
            loyalty_tier: o.loyalty_tier,
            region: o.region,
            baseline_buy_prob_daily: o.baseline_buy_prob_daily,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiTables {
    pub campaign: Vec<CampaignKpi>,
    pub segment: Vec<SegmentKpi>,
    pub outcomes_light: Vec<OutcomeLight>,
}

// ── Accumulation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct GroupAccumulator {
    n: u64,
    converters: u64,
    revenue: f64,
    revenue_sq: f64,
}

impl GroupAccumulator {
    fn add(&mut self, outcome: &OutcomeRecord) {
        self.n += 1;
        if outcome.converted_flag {
            self.converters += 1;
        }
        self.revenue += outcome.revenue_in_window;
        self.revenue_sq += outcome.revenue_in_window * outcome.revenue_in_window;
    }

    fn block(&self) -> KpiBlock {
        KpiBlock::from_totals(self.n, self.converters, self.revenue)
    }

    /// Sample variance of per-customer revenue; 0 below two members.
    fn variance(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        let n = self.n as f64;
        let mean = self.revenue / n;
        ((self.revenue_sq - n * mean * mean) / (n - 1.0)).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ExperimentAccumulator {
    exposed: GroupAccumulator,
    holdout: GroupAccumulator,
}

impl ExperimentAccumulator {
    fn add(&mut self, outcome: &OutcomeRecord) {
        if outcome.exposed_flag {
            self.exposed.add(outcome);
        }
        if outcome.holdout_flag {
            self.holdout.add(outcome);
        }
    }

    fn finish(&self, min_group_size: u64) -> (KpiBlock, KpiBlock, Uplift) {
        let exposed = self.exposed.block();
        let holdout = self.holdout.block();
        let rpc_uplift = exposed.rpc - holdout.rpc;

        let mut std_err_sq = 0.0;
        if self.exposed.n > 0 {
            std_err_sq += self.exposed.variance() / self.exposed.n as f64;
        }
        if self.holdout.n > 0 {
            std_err_sq += self.holdout.variance() / self.holdout.n as f64;
        }

        let uplift = Uplift {
            cr_uplift: exposed.cr - holdout.cr,
            rpc_uplift,
            rpc_uplift_std_err: std_err_sq.sqrt(),
            incremental_revenue: rpc_uplift * exposed.n_customers as f64,
            insufficient_sample_flag: exposed.n_customers < min_group_size
                || holdout.n_customers < min_group_size,
        };
        (exposed, holdout, uplift)
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

pub fn compute_campaign_kpis(
    outcomes: &[OutcomeRecord],
    campaigns: &[Campaign],
    min_group_size: u64,
) -> SimResult<Vec<CampaignKpi>> {
    let mut groups: BTreeMap<&str, ExperimentAccumulator> = BTreeMap::new();
    for outcome in outcomes {
        groups.entry(outcome.campaign_id.as_str()).or_default().add(outcome);
    }

    let campaign_by_id: HashMap<&str, &Campaign> =
        campaigns.iter().map(|c| (c.campaign_id.as_str(), c)).collect();

    groups
        .into_iter()
        .map(|(campaign_id, acc)| {
            let campaign = campaign_by_id.get(campaign_id).ok_or_else(|| {
                SimError::DanglingReference {
                    table: "mart_campaign_outcomes",
                    key: campaign_id.to_string(),
                }
            })?;
            let (exposed, holdout, uplift) = acc.finish(min_group_size);
            Ok(CampaignKpi {
                campaign_id: campaign_id.to_string(),
                campaign_name: campaign.campaign_name.clone(),
                start_date: campaign.start_date,
                channel: campaign.channel,
                target_segment: campaign.target_segment,
                attribution_window_days: campaign.attribution_window_days,
                exposed,
                holdout,
                uplift,
            })
        })
        .collect()
}

pub fn compute_segment_kpis(outcomes: &[OutcomeRecord], min_group_size: u64) -> Vec<SegmentKpi> {
    let mut groups: BTreeMap<(&str, &str), ExperimentAccumulator> = BTreeMap::new();
    for outcome in outcomes {
        groups
            .entry((outcome.campaign_id.as_str(), outcome.segment_name.as_str()))
            .or_default()
            .add(outcome);
    }

    groups
        .into_iter()
        .map(|((campaign_id, segment_name), acc)| {
            let (exposed, holdout, uplift) = acc.finish(min_group_size);
            SegmentKpi {
                campaign_id: campaign_id.to_string(),
                segment_name: segment_name.to_string(),
                exposed,
                holdout,
                uplift,
            }
        })
        .collect()
}

pub fn outcomes_light(outcomes: &[OutcomeRecord]) -> Vec<OutcomeLight> {
    outcomes.iter().map(OutcomeLight::from).collect()
}

pub fn compute_kpi_tables(
    outcomes: &[OutcomeRecord],
    campaigns: &[Campaign],
    min_group_size: u64,
) -> SimResult<KpiTables> {
    let campaign = compute_campaign_kpis(outcomes, campaigns, min_group_size)?;
    let segment = compute_segment_kpis(outcomes, min_group_size);
    log::info!(
        "kpi: {} campaign rows, {} segment rows ({} flagged insufficient)",
        campaign.len(),
        segment.len(),
        campaign.iter().filter(|k| k.uplift.insufficient_sample_flag).count()
    );
    Ok(KpiTables {
        campaign,
        segment,
        outcomes_light: outcomes_light(outcomes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_has_zero_rates() {
        let block = KpiBlock::from_totals(0, 0, 0.0);
        assert_eq!(block.cr, 0.0);
        assert_eq!(block.rpc, 0.0);
    }

    #[test]
    fn variance_needs_two_members() {
        let acc = GroupAccumulator {
            n: 1,
            converters: 1,
            revenue: 10.0,
            revenue_sq: 100.0,
        };
        assert_eq!(acc.variance(), 0.0);

        // Revenues 0 and 10: mean 5, sample variance 50.
        let acc = GroupAccumulator {
            n: 2,
            converters: 1,
            revenue: 10.0,
            revenue_sq: 100.0,
        };
        assert!((acc.variance() - 50.0).abs() < 1e-9);
    }
}
