use super::{category, SimStore};
use crate::{
    error::SimResult,
    kpi::{CampaignKpi, KpiBlock, OutcomeLight, SegmentKpi, Uplift},
};
use rusqlite::{params, Row};

/// Five block columns starting at `at`: n, converters, revenue, cr, rpc.
fn block_at(row: &Row<'_>, at: usize) -> rusqlite::Result<KpiBlock> {
    Ok(KpiBlock {
        n_customers: row.get::<_, i64>(at)? as u64,
        converters: row.get::<_, i64>(at + 1)? as u64,
        revenue: row.get(at + 2)?,
        cr: row.get(at + 3)?,
        rpc: row.get(at + 4)?,
    })
}

fn uplift_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Uplift> {
    Ok(Uplift {
        cr_uplift: row.get(at)?,
        rpc_uplift: row.get(at + 1)?,
        rpc_uplift_std_err: row.get(at + 2)?,
        incremental_revenue: row.get(at + 3)?,
        insufficient_sample_flag: row.get(at + 4)?,
    })
}

impl SimStore {
    pub fn replace_campaign_kpis(&self, run_id: &str, kpis: &[CampaignKpi]) -> SimResult<()> {
        self.replace_rows(
            "mart_kpis_campaign",
            run_id,
            "INSERT INTO mart_kpis_campaign (
                run_id, campaign_id, campaign_name, start_date, channel, target_segment,
                attribution_window_days,
                exposed_n_customers, exposed_converters, exposed_revenue, exposed_cr, exposed_rpc,
                holdout_n_customers, holdout_converters, holdout_revenue, holdout_cr, holdout_rpc,
                cr_uplift, rpc_uplift, rpc_uplift_std_err, incremental_revenue,
                insufficient_sample_flag
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                      ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            kpis,
            |stmt, k| {
                stmt.execute(params![
                    run_id,
                    k.campaign_id,
                    k.campaign_name,
                    k.start_date,
                    k.channel.as_str(),
                    k.target_segment.as_str(),
                    k.attribution_window_days,
                    k.exposed.n_customers as i64,
                    k.exposed.converters as i64,
                    k.exposed.revenue,
                    k.exposed.cr,
                    k.exposed.rpc,
                    k.holdout.n_customers as i64,
                    k.holdout.converters as i64,
                    k.holdout.revenue,
                    k.holdout.cr,
                    k.holdout.rpc,
                    k.uplift.cr_uplift,
                    k.uplift.rpc_uplift,
                    k.uplift.rpc_uplift_std_err,
                    k.uplift.incremental_revenue,
                    k.uplift.insufficient_sample_flag,
                ])
            },
        )
    }

    pub fn load_campaign_kpis(&self, run_id: &str) -> SimResult<Vec<CampaignKpi>> {
        self.load_rows(
            "mart_kpis_campaign",
            run_id,
            "SELECT campaign_id, campaign_name, start_date, channel, target_segment,
                    attribution_window_days,
                    exposed_n_customers, exposed_converters, exposed_revenue, exposed_cr, exposed_rpc,
                    holdout_n_customers, holdout_converters, holdout_revenue, holdout_cr, holdout_rpc,
                    cr_uplift, rpc_uplift, rpc_uplift_std_err, incremental_revenue,
                    insufficient_sample_flag
             FROM mart_kpis_campaign WHERE run_id = ?1
             ORDER BY campaign_id ASC",
            |row| {
                Ok(CampaignKpi {
                    campaign_id: row.get(0)?,
                    campaign_name: row.get(1)?,
                    start_date: row.get(2)?,
                    channel: category(row, 3)?,
                    target_segment: category(row, 4)?,
                    attribution_window_days: row.get(5)?,
                    exposed: block_at(row, 6)?,
                    holdout: block_at(row, 11)?,
                    uplift: uplift_at(row, 16)?,
                })
            },
        )
    }

    pub fn replace_segment_kpis(&self, run_id: &str, kpis: &[SegmentKpi]) -> SimResult<()> {
        self.replace_rows(
            "mart_kpis_segment",
            run_id,
            "INSERT INTO mart_kpis_segment (
                run_id, campaign_id, segment_name,
                exposed_n_customers, exposed_converters, exposed_revenue, exposed_cr, exposed_rpc,
                holdout_n_customers, holdout_converters, holdout_revenue, holdout_cr, holdout_rpc,
                cr_uplift, rpc_uplift, rpc_uplift_std_err, incremental_revenue,
                insufficient_sample_flag
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                      ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            kpis,
            |stmt, k| {
                stmt.execute(params![
                    run_id,
                    k.campaign_id,
                    k.segment_name,
                    k.exposed.n_customers as i64,
                    k.exposed.converters as i64,
                    k.exposed.revenue,
                    k.exposed.cr,
                    k.exposed.rpc,
                    k.holdout.n_customers as i64,
                    k.holdout.converters as i64,
                    k.holdout.revenue,
                    k.holdout.cr,
                    k.holdout.rpc,
                    k.uplift.cr_uplift,
                    k.uplift.rpc_uplift,
                    k.uplift.rpc_uplift_std_err,
                    k.uplift.incremental_revenue,
                    k.uplift.insufficient_sample_flag,
                ])
            },
        )
    }

    pub fn load_segment_kpis(&self, run_id: &str) -> SimResult<Vec<SegmentKpi>> {
        self.load_rows(
            "mart_kpis_segment",
            run_id,
            "SELECT campaign_id, segment_name,
                    exposed_n_customers, exposed_converters, exposed_revenue, exposed_cr, exposed_rpc,
                    holdout_n_customers, holdout_converters, holdout_revenue, holdout_cr, holdout_rpc,
                    cr_uplift, rpc_uplift, rpc_uplift_std_err, incremental_revenue,
                    insufficient_sample_flag
             FROM mart_kpis_segment WHERE run_id = ?1
             ORDER BY campaign_id ASC, segment_name ASC",
            |row| {
                Ok(SegmentKpi {
                    campaign_id: row.get(0)?,
                    segment_name: row.get(1)?,
                    exposed: block_at(row, 2)?,
                    holdout: block_at(row, 7)?,
                    uplift: uplift_at(row, 12)?,
                })
            },
        )
    }

    pub fn replace_outcomes_light(&self, run_id: &str, rows: &[OutcomeLight]) -> SimResult<()> {
        self.replace_rows(
            "mart_campaign_outcomes_light",
            run_id,
            "INSERT INTO mart_campaign_outcomes_light (
                run_id, campaign_id, customer_id, exposed_flag, holdout_flag, converted_flag,
                revenue_in_window, segment_name, lifecycle, loyalty_tier, region,
                baseline_buy_prob_daily
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rows,
            |stmt, o| {
                stmt.execute(params![
                    run_id,
                    o.campaign_id,
                    o.customer_id,
                    o.exposed_flag,
                    o.holdout_flag,
                    o.converted_flag,
                    o.revenue_in_window,
                    o.segment_name,
                    o.lifecycle.as_str(),
                    o.loyalty_tier.as_str(),
                    o.region.as_str(),
                    o.baseline_buy_prob_daily,
                ])
            },
        )
    }

    pub fn load_outcomes_light(&self, run_id: &str) -> SimResult<Vec<OutcomeLight>> {
        self.load_rows(
            "mart_campaign_outcomes_light",
            run_id,
            "SELECT campaign_id, customer_id, exposed_flag, holdout_flag, converted_flag,
                    revenue_in_window, segment_name, lifecycle, loyalty_tier, region,
                    baseline_buy_prob_daily
             FROM mart_campaign_outcomes_light WHERE run_id = ?1
             ORDER BY campaign_id ASC, customer_id ASC",
            |row| {
                Ok(OutcomeLight {
                    campaign_id: row.get(0)?,
                    customer_id: row.get(1)?,
                    exposed_flag: row.get(2)?,
                    holdout_flag: row.get(3)?,
                    converted_flag: row.get(4)?,
                    revenue_in_window: row.get(5)?,
                    segment_name: row.get(6)?,
                    lifecycle: category(row, 7)?,
                    loyalty_tier: category(row, 8)?,
                    region: category(row, 9)?,
                    baseline_buy_prob_daily: row.get(10)?,
                })
            },
        )
    }
}
