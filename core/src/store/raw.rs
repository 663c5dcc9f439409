use super::{category, SimStore};
use crate::{
    campaign::Campaign, eligibility::EligibilityRecord, error::SimResult, exposure::ExposureRecord,
    population::Customer, transaction::Transaction,
};
use rusqlite::params;

impl SimStore {
    pub fn replace_customers(&self, run_id: &str, customers: &[Customer]) -> SimResult<()> {
        self.replace_rows(
            "dim_customers",
            run_id,
            "INSERT INTO dim_customers (
                run_id, customer_id, signup_date, tenure_days, loyalty_tier, region,
                channel_pref, consent_email, consent_sms, baseline_buy_prob_daily, lifecycle
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            customers,
            |stmt, c| {
                stmt.execute(params![
                    run_id,
                    c.customer_id,
                    c.signup_date,
                    c.tenure_days,
                    c.loyalty_tier.as_str(),
                    c.region.as_str(),
                    c.channel_pref.as_str(),
                    c.consent_email,
                    c.consent_sms,
                    c.baseline_buy_prob_daily,
                    c.lifecycle.as_str(),
                ])
            },
        )
    }

    pub fn load_customers(&self, run_id: &str) -> SimResult<Vec<Customer>> {
        self.load_rows(
            "dim_customers",
            run_id,
            "SELECT customer_id, signup_date, tenure_days, loyalty_tier, region,
                    channel_pref, consent_email, consent_sms, baseline_buy_prob_daily, lifecycle
             FROM dim_customers WHERE run_id = ?1
             ORDER BY customer_id ASC",
            |row| {
                Ok(Customer {
                    customer_id: row.get(0)?,
                    signup_date: row.get(1)?,
                    tenure_days: row.get(2)?,
                    loyalty_tier: category(row, 3)?,
                    region: category(row, 4)?,
                    channel_pref: category(row, 5)?,
                    consent_email: row.get(6)?,
                    consent_sms: row.get(7)?,
                    baseline_buy_prob_daily: row.get(8)?,
                    lifecycle: category(row, 9)?,
                })
            },
        )
    }

    pub fn replace_campaigns(&self, run_id: &str, campaigns: &[Campaign]) -> SimResult<()> {
        self.replace_rows(
            "dim_campaigns",
            run_id,
            "INSERT INTO dim_campaigns (
                run_id, campaign_id, campaign_name, start_date, end_date, channel,
                target_segment, attribution_window_days, holdout_pct, true_rpc_uplift
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            campaigns,
            |stmt, c| {
                stmt.execute(params![
                    run_id,
                    c.campaign_id,
                    c.campaign_name,
                    c.start_date,
                    c.end_date,
                    c.channel.as_str(),
                    c.target_segment.as_str(),
                    c.attribution_window_days,
                    c.holdout_pct,
                    c.true_rpc_uplift,
                ])
            },
        )
    }

    pub fn load_campaigns(&self, run_id: &str) -> SimResult<Vec<Campaign>> {
        self.load_rows(
            "dim_campaigns",
            run_id,
            "SELECT campaign_id, campaign_name, start_date, end_date, channel,
                    target_segment, attribution_window_days, holdout_pct, true_rpc_uplift
             FROM dim_campaigns WHERE run_id = ?1
             ORDER BY campaign_id ASC",
            |row| {
                Ok(Campaign {
                    campaign_id: row.get(0)?,
                    campaign_name: row.get(1)?,
                    start_date: row.get(2)?,
                    end_date: row.get(3)?,
                    channel: category(row, 4)?,
                    target_segment: category(row, 5)?,
                    attribution_window_days: row.get(6)?,
                    holdout_pct: row.get(7)?,
                    true_rpc_uplift: row.get(8)?,
                })
            },
        )
    }

    pub fn replace_eligibility(&self, run_id: &str, records: &[EligibilityRecord]) -> SimResult<()> {
        self.replace_rows(
            "fact_eligibility",
            run_id,
            "INSERT INTO fact_eligibility (
                run_id, campaign_id, customer_id, eligible_flag, eligibility_reason, snapshot_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            records,
            |stmt, r| {
                stmt.execute(params![
                    run_id,
                    r.campaign_id,
                    r.customer_id,
                    r.eligible_flag,
                    r.eligibility_reason.as_str(),
                    r.snapshot_date,
                ])
            },
        )
    }

    pub fn load_eligibility(&self, run_id: &str) -> SimResult<Vec<EligibilityRecord>> {
        self.load_rows(
            "fact_eligibility",
            run_id,
            "SELECT campaign_id, customer_id, eligible_flag, eligibility_reason, snapshot_date
             FROM fact_eligibility WHERE run_id = ?1
             ORDER BY campaign_id ASC, customer_id ASC",
            |row| {
                Ok(EligibilityRecord {
                    campaign_id: row.get(0)?,
                    customer_id: row.get(1)?,
                    eligible_flag: row.get(2)?,
                    eligibility_reason: category(row, 3)?,
                    snapshot_date: row.get(4)?,
                })
            },
        )
    }

    pub fn replace_exposure(&self, run_id: &str, records: &[ExposureRecord]) -> SimResult<()> {
        self.replace_rows(
            "fact_exposure",
            run_id,
            "INSERT INTO fact_exposure (
                run_id, campaign_id, customer_id, send_id,
                delivered_flag, delivered_ts, bounce_flag, control_flag
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            records,
            |stmt, r| {
                stmt.execute(params![
                    run_id,
                    r.campaign_id,
                    r.customer_id,
                    r.send_id,
                    r.delivered_flag,
                    r.delivered_ts,
                    r.bounce_flag,
                    r.control_flag,
                ])
            },
        )
    }

    pub fn load_exposure(&self, run_id: &str) -> SimResult<Vec<ExposureRecord>> {
        self.load_rows(
            "fact_exposure",
            run_id,
            "SELECT campaign_id, customer_id, send_id,
                    delivered_flag, delivered_ts, bounce_flag, control_flag
             FROM fact_exposure WHERE run_id = ?1
             ORDER BY campaign_id ASC, customer_id ASC",
            |row| {
                Ok(ExposureRecord {
                    campaign_id: row.get(0)?,
                    customer_id: row.get(1)?,
                    send_id: row.get(2)?,
                    delivered_flag: row.get(3)?,
                    delivered_ts: row.get(4)?,
                    bounce_flag: row.get(5)?,
                    control_flag: row.get(6)?,
                })
            },
        )
    }

    pub fn replace_transactions(&self, run_id: &str, transactions: &[Transaction]) -> SimResult<()> {
        self.replace_rows(
            "fact_transactions",
            run_id,
            "INSERT INTO fact_transactions (
                run_id, txn_id, customer_id, txn_ts, store_id, channel, gross_revenue, items_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            transactions,
            |stmt, t| {
                stmt.execute(params![
                    run_id,
                    t.txn_id,
                    t.customer_id,
                    t.txn_ts,
                    t.store_id,
                    t.channel.as_str(),
                    t.gross_revenue,
                    t.items_count,
                ])
            },
        )
    }

    pub fn load_transactions(&self, run_id: &str) -> SimResult<Vec<Transaction>> {
        self.load_rows(
            "fact_transactions",
            run_id,
            "SELECT txn_id, customer_id, txn_ts, store_id, channel, gross_revenue, items_count
             FROM fact_transactions WHERE run_id = ?1
             ORDER BY txn_id ASC",
            |row| {
                Ok(Transaction {
                    txn_id: row.get(0)?,
                    customer_id: row.get(1)?,
                    txn_ts: row.get(2)?,
                    store_id: row.get(3)?,
                    channel: category(row, 4)?,
                    gross_revenue: row.get(5)?,
                    items_count: row.get(6)?,
                })
            },
        )
    }
}
