//! Run configuration: one validated structure loaded from `settings.json`.
//!
//! Every field has a default, so a settings file may omit any key;
//! `validate()` rejects values the pipeline cannot honour.
//! In tests, use `SimConfig::default_test()`.

use crate::{
    calendar::Horizon,
    campaign::{LEAD_IN_DAYS, TRAILING_BUFFER_DAYS},
    error::{SimError, SimResult},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub random_seed: u64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { random_seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub n_customers: usize,
    pub n_campaigns: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_customers: 25_000,
            n_campaigns: 12,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignDesignConfig {
    pub default_attribution_window_days: u32,
    pub holdout_pct: f64,
    pub bounce_rate: f64,
    /// Extra forced eligibility is drawn at `overlap_rate * 0.05`.
    pub overlap_rate: f64,
}

impl Default for CampaignDesignConfig {
    fn default() -> Self {
        Self {
            default_attribution_window_days: 7,
            holdout_pct: 0.20,
            bounce_rate: 0.03,
            overlap_rate: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Both exposed and holdout groups need at least this many customers.
    pub min_group_size: u64,
    /// RPC uplift within this many standard errors of zero is read as no effect.
    pub significance_z: f64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            min_group_size: 300,
            significance_z: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub marts_dir: PathBuf,
    pub db_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            marts_dir: PathBuf::from("data/marts"),
            db_path: "data/uplift.db".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub project: ProjectConfig,
    pub simulation: SimulationConfig,
    pub campaign_design: CampaignDesignConfig,
    pub governance: GovernanceConfig,
    pub output: OutputConfig,
}

impl SimConfig {
    /// Load and validate a settings file. A missing file is fatal.
    pub fn load(path: &Path) -> SimResult<Self> {
        if !path.exists() {
            return Err(SimError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Small, fast configuration for tests.
    pub fn default_test() -> Self {
        Self {
            simulation: SimulationConfig {
                n_customers: 2_000,
                n_campaigns: 8,
                ..SimulationConfig::default()
            },
            governance: GovernanceConfig {
                min_group_size: 50,
                ..GovernanceConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.project.random_seed = seed;
        self
    }

    pub fn horizon(&self) -> SimResult<Horizon> {
        Horizon::new(self.simulation.start_date, self.simulation.end_date)
    }

    /// Number of distinct days campaign starts can be drawn from.
    pub fn campaign_start_slots(&self) -> i64 {
        let span = (self.simulation.end_date - self.simulation.start_date).num_days();
        (span - LEAD_IN_DAYS - TRAILING_BUFFER_DAYS + 1).max(0)
    }

    pub fn validate(&self) -> SimResult<()> {
        self.horizon()?;

        if self.simulation.n_customers == 0 {
            return Err(invalid("simulation.n_customers must be > 0"));
        }
        let slots = self.campaign_start_slots();
        if self.simulation.n_campaigns as i64 > slots {
            return Err(invalid(&format!(
                "simulation.n_campaigns = {} but the horizon only has {slots} candidate start days",
                self.simulation.n_campaigns
            )));
        }
        if self.campaign_design.default_attribution_window_days == 0 {
            return Err(invalid("campaign_design.default_attribution_window_days must be > 0"));
        }

        let rates = [
            ("campaign_design.holdout_pct", self.campaign_design.holdout_pct),
            ("campaign_design.bounce_rate", self.campaign_design.bounce_rate),
            ("campaign_design.overlap_rate", self.campaign_design.overlap_rate),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(&format!("{name} = {value} is outside [0, 1]")));
            }
        }
        let z = self.governance.significance_z;
        if z.is_nan() || z < 0.0 {
            return Err(invalid("governance.significance_z must be >= 0"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> SimError {
    SimError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg = SimConfig::from_json(r#"{ "project": { "random_seed": 7 } }"#).unwrap();
        assert_eq!(cfg.project.random_seed, 7);
        assert_eq!(cfg.simulation.n_customers, 25_000);
        assert_eq!(cfg.campaign_design.default_attribution_window_days, 7);
    }

    #[test]
    fn out_of_range_rates_are_rejected() {
        let err = SimConfig::from_json(r#"{ "campaign_design": { "holdout_pct": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn too_many_campaigns_for_horizon_is_rejected() {
        let json = r#"{ "simulation": { "n_campaigns": 500 } }"#;
        assert!(matches!(SimConfig::from_json(json), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let err = SimConfig::load(Path::new("/definitely/not/here/settings.json")).unwrap_err();
        assert!(matches!(err, SimError::ConfigNotFound { .. }));
    }
}
