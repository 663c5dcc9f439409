//! Decision layer: read-only views over the mart tables.
//!
//! Nothing here writes. Every function takes already-loaded mart rows;
//! an empty campaign mart is reported as a missing table.

use crate::{
    error::{SimError, SimResult},
    kpi::{CampaignKpi, OutcomeLight, SegmentKpi, Uplift},
    types::{Channel, CustomerId, Lifecycle},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Customers shown in a campaign drilldown.
pub const TOP_CUSTOMERS: usize = 25;
pub const TOP_SHARE_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    InsufficientEvidence,
    ScaleKeep,
    OptimizeRetest,
    StopInvestigate,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InsufficientEvidence => "INSUFFICIENT EVIDENCE",
            Self::ScaleKeep => "SCALE / KEEP",
            Self::OptimizeRetest => "OPTIMIZE / RE-TEST",
            Self::StopInvestigate => "STOP / INVESTIGATE",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Label one uplift estimate.
///
/// An estimate within `significance_z` standard errors of zero is
/// indistinguishable from noise and gets `OPTIMIZE / RE-TEST`.
pub fn decide(uplift: &Uplift, significance_z: f64) -> Decision {
    if uplift.insufficient_sample_flag {
        return Decision::InsufficientEvidence;
    }
    if uplift.rpc_uplift.abs() <= significance_z * uplift.rpc_uplift_std_err {
        return Decision::OptimizeRetest;
    }
    if uplift.incremental_revenue > 0.0 {
        Decision::ScaleKeep
    } else if uplift.incremental_revenue < 0.0 {
        Decision::StopInvestigate
    } else {
        Decision::OptimizeRetest
    }
}

fn require_rows(run_id: &str, kpis: &[CampaignKpi]) -> SimResult<()> {
    if kpis.is_empty() {
        return Err(SimError::MissingTable {
            table: "mart_kpis_campaign",
            run_id: run_id.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCampaign {
    pub rank: usize,
    pub campaign_id: String,
    pub campaign_name: String,
    pub channel: Channel,
    pub target_segment: Lifecycle,
    pub exposed_n: u64,
    pub holdout_n: u64,
    pub cr_uplift: f64,
    pub rpc_uplift: f64,
    pub rpc_uplift_std_err: f64,
    pub incremental_revenue: f64,
    pub decision: Decision,
}

/// Campaigns by incremental revenue, highest first. Ties keep campaign id order.
pub fn rank_campaigns(
    run_id: &str,
    kpis: &[CampaignKpi],
    significance_z: f64,
) -> SimResult<Vec<RankedCampaign>> {
    require_rows(run_id, kpis)?;

    let mut sorted: Vec<&CampaignKpi> = kpis.iter().collect();
    sorted.sort_by(|a, b| {
        b.uplift
            .incremental_revenue
            .total_cmp(&a.uplift.incremental_revenue)
            .then_with(|| a.campaign_id.cmp(&b.campaign_id))
    });

    Ok(sorted
        .into_iter()
        .enumerate()
        .map(|(i, k)| RankedCampaign {
            rank: i + 1,
            campaign_id: k.campaign_id.clone(),
            campaign_name: k.campaign_name.clone(),
            channel: k.channel,
            target_segment: k.target_segment,
            exposed_n: k.exposed.n_customers,
            holdout_n: k.holdout.n_customers,
            cr_uplift: k.uplift.cr_uplift,
            rpc_uplift: k.uplift.rpc_uplift,
            rpc_uplift_std_err: k.uplift.rpc_uplift_std_err,
            incremental_revenue: k.uplift.incremental_revenue,
            decision: decide(&k.uplift, significance_z),
        })
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub n_campaigns: usize,
    pub total_incremental_revenue: f64,
    pub mean_rpc_uplift: f64,
    pub mean_cr_uplift: f64,
    pub n_insufficient: usize,
}

pub fn portfolio_summary(run_id: &str, kpis: &[CampaignKpi]) -> SimResult<PortfolioSummary> {
    require_rows(run_id, kpis)?;
    let n = kpis.len() as f64;
    Ok(PortfolioSummary {
        n_campaigns: kpis.len(),
        total_incremental_revenue: kpis.iter().map(|k| k.uplift.incremental_revenue).sum(),
        mean_rpc_uplift: kpis.iter().map(|k| k.uplift.rpc_uplift).sum::<f64>() / n,
        mean_cr_uplift: kpis.iter().map(|k| k.uplift.cr_uplift).sum::<f64>() / n,
        n_insufficient: kpis
            .iter()
            .filter(|k| k.uplift.insufficient_sample_flag)
            .count(),
    })
}

/// One campaign's segment rows, largest incremental revenue first.
pub fn segment_concentration<'a>(segments: &'a [SegmentKpi], campaign_id: &str) -> Vec<&'a SegmentKpi> {
    let mut rows: Vec<&SegmentKpi> = segments
        .iter()
        .filter(|s| s.campaign_id == campaign_id)
        .collect();
    rows.sort_by(|a, b| {
        b.uplift
            .incremental_revenue
            .total_cmp(&a.uplift.incremental_revenue)
            .then_with(|| a.segment_name.cmp(&b.segment_name))
    });
    rows
}

// ── Distribution checks ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub group: &'static str,
    pub customers: u64,
    pub converters: u64,
    pub mean_revenue: f64,
    pub p95_revenue: f64,
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn campaign_rows<'a>(light: &'a [OutcomeLight], campaign_id: &'a str) -> impl Iterator<Item = &'a OutcomeLight> {
    light.iter().filter(move |o| o.campaign_id == campaign_id)
}

/// Exposed then Holdout; a group with no members is omitted.
pub fn group_distribution(light: &[OutcomeLight], campaign_id: &str) -> Vec<GroupDistribution> {
    let groups: [(&'static str, fn(&OutcomeLight) -> bool); 2] = [
        ("Exposed", |o: &OutcomeLight| o.exposed_flag),
        ("Holdout", |o: &OutcomeLight| o.holdout_flag),
    ];

    groups
        .into_iter()
        .filter_map(|(group, member)| {
            let rows: Vec<&OutcomeLight> = campaign_rows(light, campaign_id).filter(|o| member(o)).collect();
            if rows.is_empty() {
                return None;
            }
            let mut revenue: Vec<f64> = rows.iter().map(|o| o.revenue_in_window).collect();
            revenue.sort_by(f64::total_cmp);
            Some(GroupDistribution {
                group,
                customers: rows.len() as u64,
                converters: rows.iter().filter(|o| o.converted_flag).count() as u64,
                mean_revenue: revenue.iter().sum::<f64>() / rows.len() as f64,
                p95_revenue: quantile(&revenue, 0.95),
            })
        })
        .collect()
}

/// Share of a campaign's in-window revenue earned by its top 5% of customers.
pub fn top_revenue_share(light: &[OutcomeLight], campaign_id: &str) -> f64 {
    let mut revenue: Vec<f64> = campaign_rows(light, campaign_id)
        .map(|o| o.revenue_in_window)
        .collect();
    if revenue.is_empty() {
        return 0.0;
    }
    revenue.sort_by(|a, b| b.total_cmp(a));

    let cut = ((revenue.len() as f64 * TOP_SHARE_FRACTION).floor() as usize).max(1);
    let total: f64 = revenue.iter().sum();
    let top: f64 = revenue[..cut].iter().sum();
    top / if total > 0.0 { total } else { 1.0 }
}

/// Highest in-window revenue first; ties by customer id.
pub fn top_customers<'a>(light: &'a [OutcomeLight], campaign_id: &str, n: usize) -> Vec<&'a OutcomeLight> {
    let mut rows: Vec<&OutcomeLight> = light.iter().filter(|o| o.campaign_id == campaign_id).collect();
    rows.sort_by(|a, b| {
        b.revenue_in_window
            .total_cmp(&a.revenue_in_window)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    rows.truncate(n);
    rows
}

// ── Lookup ───────────────────────────────────────────────────────────────────

pub fn parse_customer_id(input: &str) -> SimResult<CustomerId> {
    input
        .trim()
        .parse::<CustomerId>()
        .map_err(|_| SimError::InvalidCustomerId {
            input: input.to_string(),
        })
}

/// `Ok(None)` when the id is well formed but the customer was not eligible.
pub fn lookup_customer<'a>(
    light: &'a [OutcomeLight],
    campaign_id: &str,
    input: &str,
) -> SimResult<Option<&'a OutcomeLight>> {
    let customer_id = parse_customer_id(input)?;
    Ok(light
        .iter()
        .find(|o| o.campaign_id == campaign_id && o.customer_id == customer_id))
}
