//! Flat CSV snapshots of every produced table.
//!
//! One file per table, named after the table, in the directory configured
//! for its layer. Row order is the order the pipeline produced, so two runs
//! with the same seed write byte-identical files.

use crate::{
    config::OutputConfig,
    engine::RawTables,
    error::SimResult,
    kpi::{CampaignKpi, KpiTables, SegmentKpi},
    outcome::OutcomeRecord,
    types::{Channel, Lifecycle},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::{fs, io::Write, path::Path};

pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> SimResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> SimResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    write_rows(fs::File::create(path)?, rows)?;
    log::debug!("export: {} rows → {}", rows.len(), path.display());
    Ok(())
}

pub fn export_raw(output: &OutputConfig, raw: &RawTables) -> SimResult<()> {
    let dir = &output.raw_dir;
    write_csv(&dir.join("dim_customers.csv"), &raw.customers)?;
    write_csv(&dir.join("dim_campaigns.csv"), &raw.campaigns)?;
    write_csv(&dir.join("fact_eligibility.csv"), &raw.eligibility)?;
    write_csv(&dir.join("fact_exposure.csv"), &raw.exposure)?;
    write_csv(&dir.join("fact_transactions.csv"), &raw.transactions)?;
    log::info!("export: raw tables written to {}", dir.display());
    Ok(())
}

pub fn export_processed(output: &OutputConfig, outcomes: &[OutcomeRecord]) -> SimResult<()> {
    write_csv(&output.processed_dir.join("mart_campaign_outcomes.csv"), outcomes)?;
    log::info!("export: outcomes written to {}", output.processed_dir.display());
    Ok(())
}

pub fn export_marts(output: &OutputConfig, kpis: &KpiTables) -> SimResult<()> {
    let dir = &output.marts_dir;
    let campaign: Vec<CampaignKpiRow> = kpis.campaign.iter().map(CampaignKpiRow::from).collect();
    let segment: Vec<SegmentKpiRow> = kpis.segment.iter().map(SegmentKpiRow::from).collect();
    write_csv(&dir.join("mart_kpis_campaign.csv"), &campaign)?;
    write_csv(&dir.join("mart_kpis_segment.csv"), &segment)?;
    write_csv(&dir.join("mart_campaign_outcomes_light.csv"), &kpis.outcomes_light)?;
    log::info!("export: marts written to {}", dir.display());
    Ok(())
}

// csv cannot serialize nested or flattened structs, so KPI rows are
// spelled out column by column.

#[derive(Serialize)]
struct CampaignKpiRow<'a> {
    campaign_id: &'a str,
    campaign_name: &'a str,
    start_date: NaiveDate,
    channel: Channel,
    target_segment: Lifecycle,
    attribution_window_days: u32,
    exposed_n_customers: u64,
    exposed_converters: u64,
    exposed_revenue: f64,
    #[serde(rename = "exposed_CR")]
    exposed_cr: f64,
    #[serde(rename = "exposed_RPC")]
    exposed_rpc: f64,
    holdout_n_customers: u64,
    holdout_converters: u64,
    holdout_revenue: f64,
    #[serde(rename = "holdout_CR")]
    holdout_cr: f64,
    #[serde(rename = "holdout_RPC")]
    holdout_rpc: f64,
    #[serde(rename = "CR_uplift")]
    cr_uplift: f64,
    #[serde(rename = "RPC_uplift")]
    rpc_uplift: f64,
    #[serde(rename = "RPC_uplift_std_err")]
    rpc_uplift_std_err: f64,
    incremental_revenue: f64,
    insufficient_sample_flag: bool,
}

#[derive(Serialize)]
struct SegmentKpiRow<'a> {
    campaign_id: &'a str,
    segment_name: &'a str,
    exposed_n_customers: u64,
    exposed_converters: u64,
    exposed_revenue: f64,
    #[serde(rename = "exposed_CR")]
    exposed_cr: f64,
    #[serde(rename = "exposed_RPC")]
    exposed_rpc: f64,
    holdout_n_customers: u64,
    holdout_converters: u64,
    holdout_revenue: f64,
    #[serde(rename = "holdout_CR")]
    holdout_cr: f64,
    #[serde(rename = "holdout_RPC")]
    holdout_rpc: f64,
    #[serde(rename = "CR_uplift")]
    cr_uplift: f64,
    #[serde(rename = "RPC_uplift")]
    rpc_uplift: f64,
    #[serde(rename = "RPC_uplift_std_err")]
    rpc_uplift_std_err: f64,
    incremental_revenue: f64,
    insufficient_sample_flag: bool,
}

impl<'a> From<&'a CampaignKpi> for CampaignKpiRow<'a> {
    fn from(k: &'a CampaignKpi) -> Self {
        Self {
            campaign_id: &k.campaign_id,
            campaign_name: &k.campaign_name,
            start_date: k.start_date,
            channel: k.channel,
            target_segment: k.target_segment,
            attribution_window_days: k.attribution_window_days,
            exposed_n_customers: k.exposed.n_customers,
            exposed_converters: k.exposed.converters,
            exposed_revenue: k.exposed.revenue,
            exposed_cr: k.exposed.cr,
            exposed_rpc: k.exposed.rpc,
            holdout_n_customers: k.holdout.n_customers,
            holdout_converters: k.holdout.converters,
            holdout_revenue: k.holdout.revenue,
            holdout_cr: k.holdout.cr,
            holdout_rpc: k.holdout.rpc,
            cr_uplift: k.uplift.cr_uplift,
            rpc_uplift: k.uplift.rpc_uplift,
            rpc_uplift_std_err: k.uplift.rpc_uplift_std_err,
            incremental_revenue: k.uplift.incremental_revenue,
            insufficient_sample_flag: k.uplift.insufficient_sample_flag,
        }
    }
}

impl<'a> From<&'a SegmentKpi> for SegmentKpiRow<'a> {
    fn from(k: &'a SegmentKpi) -> Self {
        Self {
            campaign_id: &k.campaign_id,
            segment_name: &k.segment_name,
            exposed_n_customers: k.exposed.n_customers,
            exposed_converters: k.exposed.converters,
            exposed_revenue: k.exposed.revenue,
            exposed_cr: k.exposed.cr,
            exposed_rpc: k.exposed.rpc,
            holdout_n_customers: k.holdout.n_customers,
            holdout_converters: k.holdout.converters,
            holdout_revenue: k.holdout.revenue,
            holdout_cr: k.holdout.cr,
            holdout_rpc: k.holdout.rpc,
            cr_uplift: k.uplift.cr_uplift,
            rpc_uplift: k.uplift.rpc_uplift,
            rpc_uplift_std_err: k.uplift.rpc_uplift_std_err,
            incremental_revenue: k.uplift.incremental_revenue,
            insufficient_sample_flag: k.uplift.insufficient_sample_flag,
        }
    }
}
