//! Campaign incrementality simulation and attribution.
//!
//! A seeded pipeline simulates customers, campaigns, eligibility, exposure
//! and transactions, attributes in-window revenue to exposed and holdout
//! customers, and aggregates uplift KPIs for a read-only decision layer.

pub mod calendar;
pub mod campaign;
pub mod config;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod event;
pub mod export;
pub mod exposure;
pub mod kpi;
pub mod outcome;
pub mod population;
pub mod report;
pub mod rng;
pub mod store;
pub mod transaction;
pub mod types;
