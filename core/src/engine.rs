//! The pipeline engine.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Population     → dim_customers
//!   2. Campaigns      → dim_campaigns
//!   3. Eligibility    → fact_eligibility
//!   4. Exposure       → fact_exposure
//!   5. Transactions   → fact_transactions
//!   6. Outcomes       → mart_campaign_outcomes          (reads 1-5 from the store)
//!   7. KPIs           → mart_kpis_campaign, mart_kpis_segment,
//!                       mart_campaign_outcomes_light    (reads 2, 6 from the store)
//!
//! RULES:
//!   - Each stage reads only the tables written by earlier stages.
//!   - All randomness flows through the RngBank; stages 1-5 each own a stream.
//!   - Every stage completion is recorded in the stage log.
//!   - Only the store executes SQL.

use crate::{
    campaign::{generate_campaigns, Campaign},
    config::SimConfig,
    eligibility::{compute_eligibility, EligibilityRecord},
    error::SimResult,
    event::{PipelineEvent, Stage, StageLogEntry},
    export,
    exposure::{simulate_exposure, unexposed_campaigns, ExposureRecord},
    kpi::{compute_kpi_tables, KpiTables},
    outcome::{aggregate_outcomes, OutcomeRecord},
    population::{generate_population, Customer},
    rng::{RngBank, StageSlot},
    store::SimStore,
    transaction::{simulate_transactions, Transaction},
    types::RunId,
};

/// The five simulated tables of the raw layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTables {
    pub customers: Vec<Customer>,
    pub campaigns: Vec<Campaign>,
    pub eligibility: Vec<EligibilityRecord>,
    pub exposure: Vec<ExposureRecord>,
    pub transactions: Vec<Transaction>,
}

/// Every table a run produces, held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    pub raw: RawTables,
    pub outcomes: Vec<OutcomeRecord>,
    pub kpis: KpiTables,
}

/// Run stages 1-5 with one stream per stage.
pub fn generate_raw_tables(config: &SimConfig, rng_bank: &RngBank) -> SimResult<RawTables> {
    let horizon = config.horizon()?;
    let design = &config.campaign_design;

    let customers = generate_population(
        config.simulation.n_customers,
        config.simulation.end_date,
        &mut rng_bank.for_stage(StageSlot::Population),
    );
    let campaigns = generate_campaigns(config, &mut rng_bank.for_stage(StageSlot::Campaign))?;
    let eligibility = compute_eligibility(
        &customers,
        &campaigns,
        design.overlap_rate,
        &mut rng_bank.for_stage(StageSlot::Eligibility),
    );
    let exposure = simulate_exposure(
        &eligibility,
        &campaigns,
        design.bounce_rate,
        &mut rng_bank.for_stage(StageSlot::Exposure),
    );
    let transactions = simulate_transactions(
        &customers,
        &campaigns,
        &exposure,
        &horizon,
        &mut rng_bank.for_stage(StageSlot::Transaction),
    );

    Ok(RawTables {
        customers,
        campaigns,
        eligibility,
        exposure,
        transactions,
    })
}

/// The whole pipeline in memory, without a store.
pub fn run_pipeline(config: &SimConfig) -> SimResult<PipelineOutput> {
    config.validate()?;
    let rng_bank = RngBank::new(config.project.random_seed);
    let raw = generate_raw_tables(config, &rng_bank)?;
    let outcomes = aggregate_outcomes(
        &raw.customers,
        &raw.campaigns,
        &raw.eligibility,
        &raw.exposure,
        &raw.transactions,
    )?;
    let kpis = compute_kpi_tables(&outcomes, &raw.campaigns, config.governance.min_group_size)?;
    Ok(PipelineOutput {
        raw,
        outcomes,
        kpis,
    })
}

pub fn default_run_id(seed: u64) -> RunId {
    format!("run-{seed}")
}

pub struct SimEngine {
    pub run_id: RunId,
    pub config: SimConfig,
    pub rng_bank: RngBank,
    store: SimStore,
    export: bool,
}

impl SimEngine {
    /// Validate the config and register the run in the store.
    /// The store must already be migrated.
    pub fn new(run_id: RunId, config: SimConfig, store: SimStore) -> SimResult<Self> {
        config.validate()?;
        let seed = config.project.random_seed;
        store.insert_run(
            &run_id,
            seed,
            env!("CARGO_PKG_VERSION"),
            &serde_json::to_string(&config)?,
        )?;
        Ok(Self {
            run_id,
            rng_bank: RngBank::new(seed),
            config,
            store,
            export: false,
        })
    }

    /// In-memory, migrated engine for tests.
    pub fn build_test(config: SimConfig) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        let run_id = default_run_id(config.project.random_seed);
        Self::new(run_id, config, store)
    }

    /// Also write each stage's tables as CSV under the configured directories.
    pub fn with_export(mut self, enabled: bool) -> Self {
        self.export = enabled;
        self
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    /// Stages 1-5: simulate and persist the raw layer.
    pub fn generate(&self) -> SimResult<RawTables> {
        self.store.reset_stage_log(&self.run_id)?;
        self.log_event(
            "engine",
            &PipelineEvent::RunInitialized {
                run_id: self.run_id.clone(),
                seed: self.rng_bank.seed(),
            },
        )?;

        let raw = generate_raw_tables(&self.config, &self.rng_bank)?;
        self.persist_raw(&raw)?;
        Ok(raw)
    }

    /// Write a raw layer for this run. Outcome and KPI marts computed from
    /// an earlier raw layer are dropped and must be rebuilt.
    pub fn persist_raw(&self, raw: &RawTables) -> SimResult<()> {
        self.store.drop_derived_tables(&self.run_id)?;

        self.store.replace_customers(&self.run_id, &raw.customers)?;
        self.stage_completed(Stage::Population, raw.customers.len())?;
        self.store.replace_campaigns(&self.run_id, &raw.campaigns)?;
        self.stage_completed(Stage::Campaigns, raw.campaigns.len())?;
        self.store.replace_eligibility(&self.run_id, &raw.eligibility)?;
        self.stage_completed(Stage::Eligibility, raw.eligibility.len())?;

        for campaign_id in unexposed_campaigns(&raw.campaigns, &raw.exposure) {
            self.log_event(
                Stage::Exposure.as_str(),
                &PipelineEvent::CampaignSkipped {
                    campaign_id: campaign_id.to_string(),
                    reason: "no eligible customers".into(),
                },
            )?;
        }
        self.store.replace_exposure(&self.run_id, &raw.exposure)?;
        self.stage_completed(Stage::Exposure, raw.exposure.len())?;
        self.store.replace_transactions(&self.run_id, &raw.transactions)?;
        self.stage_completed(Stage::Transactions, raw.transactions.len())?;

        if self.export {
            export::export_raw(&self.config.output, raw)?;
        }
        Ok(())
    }

    /// Stage 6: attribute in-window revenue from the persisted raw layer.
    pub fn prepare_outcomes(&self) -> SimResult<Vec<OutcomeRecord>> {
        let customers = self.store.load_customers(&self.run_id)?;
        let campaigns = self.store.load_campaigns(&self.run_id)?;
        let eligibility = self.store.load_eligibility(&self.run_id)?;
        let exposure = self.store.load_exposure(&self.run_id)?;
        let transactions = self.store.load_transactions(&self.run_id)?;

        let outcomes =
            aggregate_outcomes(&customers, &campaigns, &eligibility, &exposure, &transactions)?;

        self.store.replace_outcomes(&self.run_id, &outcomes)?;
        self.stage_completed(Stage::Outcomes, outcomes.len())?;
        if self.export {
            export::export_processed(&self.config.output, &outcomes)?;
        }
        Ok(outcomes)
    }

    /// Stage 7: KPI marts from the persisted outcomes.
    pub fn compute_kpis(&self) -> SimResult<KpiTables> {
        let campaigns = self.store.load_campaigns(&self.run_id)?;
        let outcomes = self.store.load_outcomes(&self.run_id)?;

        let kpis = compute_kpi_tables(&outcomes, &campaigns, self.config.governance.min_group_size)?;

        self.store.replace_campaign_kpis(&self.run_id, &kpis.campaign)?;
        self.store.replace_segment_kpis(&self.run_id, &kpis.segment)?;
        self.store.replace_outcomes_light(&self.run_id, &kpis.outcomes_light)?;
        self.stage_completed(Stage::Kpis, kpis.campaign.len())?;
        if self.export {
            export::export_marts(&self.config.output, &kpis)?;
        }

        self.log_event(
            "engine",
            &PipelineEvent::RunCompleted {
                run_id: self.run_id.clone(),
                campaigns_reported: kpis.campaign.len() as u64,
            },
        )?;
        Ok(kpis)
    }

    pub fn run_all(&self) -> SimResult<KpiTables> {
        self.generate()?;
        self.prepare_outcomes()?;
        self.compute_kpis()
    }

    fn stage_completed(&self, stage: Stage, rows: usize) -> SimResult<()> {
        log::info!("[{}] {stage}: {rows} rows", self.run_id);
        self.log_event(
            stage.as_str(),
            &PipelineEvent::StageCompleted {
                stage,
                rows: rows as u64,
            },
        )
    }

    fn log_event(&self, stage: &str, event: &PipelineEvent) -> SimResult<()> {
        let entry = StageLogEntry::new(&self.run_id, stage, event)?;
        self.store.append_stage_event(&entry)
    }
}
