use super::{category, SimStore};
use crate::{error::SimResult, outcome::OutcomeRecord};
use rusqlite::params;

impl SimStore {
    pub fn replace_outcomes(&self, run_id: &str, outcomes: &[OutcomeRecord]) -> SimResult<()> {
        self.replace_rows(
            "mart_campaign_outcomes",
            run_id,
            "INSERT INTO mart_campaign_outcomes (
                run_id, campaign_id, customer_id,
                exposed_flag, holdout_flag, delivered_flag, control_flag, bounce_flag,
                anchor_ts, window_start, window_end, window_days,
                converted_flag, revenue_in_window, txn_count_in_window,
                lifecycle, loyalty_tier, region, baseline_buy_prob_daily, segment_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                      ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            outcomes,
            |stmt, o| {
                stmt.execute(params![
                    run_id,
                    o.campaign_id,
                    o.customer_id,
                    o.exposed_flag,
                    o.holdout_flag,
                    o.delivered_flag,
                    o.control_flag,
                    o.bounce_flag,
                    o.anchor_ts,
                    o.window_start,
                    o.window_end,
                    o.window_days,
                    o.converted_flag,
                    o.revenue_in_window,
                    o.txn_count_in_window,
                    o.lifecycle.as_str(),
                    o.loyalty_tier.as_str(),
                    o.region.as_str(),
                    o.baseline_buy_prob_daily,
                    o.segment_name,
                ])
            },
        )
    }

    pub fn load_outcomes(&self, run_id: &str) -> SimResult<Vec<OutcomeRecord>> {
        self.load_rows(
            "mart_campaign_outcomes",
            run_id,
            "SELECT campaign_id, customer_id,
                    exposed_flag, holdout_flag, delivered_flag, control_flag, bounce_flag,
                    anchor_ts, window_start, window_end, window_days,
                    converted_flag, revenue_in_window, txn_count_in_window,
                    lifecycle, loyalty_tier, region, baseline_buy_prob_daily, segment_name
             FROM mart_campaign_outcomes WHERE run_id = ?1
             ORDER BY campaign_id ASC, customer_id ASC",
            |row| {
                Ok(OutcomeRecord {
                    campaign_id: row.get(0)?,
                    customer_id: row.get(1)?,
                    exposed_flag: row.get(2)?,
                    holdout_flag: row.get(3)?,
                    delivered_flag: row.get(4)?,
                    control_flag: row.get(5)?,
                    bounce_flag: row.get(6)?,
                    anchor_ts: row.get(7)?,
                    window_start: row.get(8)?,
                    window_end: row.get(9)?,
                    window_days: row.get(10)?,
                    converted_flag: row.get(11)?,
                    revenue_in_window: row.get(12)?,
                    txn_count_in_window: row.get(13)?,
                    lifecycle: category(row, 14)?,
                    loyalty_tier: category(row, 15)?,
                    region: category(row, 16)?,
                    baseline_buy_prob_daily: row.get(17)?,
                    segment_name: row.get(18)?,
                })
            },
        )
    }
}
