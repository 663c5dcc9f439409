//! uplift-runner: headless pipeline runner.
//!
//! Usage:
//!   uplift-runner --config data/settings.json
//!   uplift-runner --seed 7 --stage generate --db data/uplift.db
//!   uplift-runner --stage report --lookup C001:123

use anyhow::{bail, Result};
use std::env;
use std::path::Path;
use uplift_core::{
    config::SimConfig,
    engine::{default_run_id, SimEngine},
    error::SimError,
    report::{
        group_distribution, lookup_customer, portfolio_summary, rank_campaigns, segment_concentration,
        top_customers, top_revenue_share, TOP_CUSTOMERS,
    },
    store::SimStore,
};

const DEFAULT_CONFIG: &str = "data/settings.json";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config_path = arg_value(&args, "--config").unwrap_or(DEFAULT_CONFIG);
    let stage = arg_value(&args, "--stage").unwrap_or("all");
    let no_export = args.iter().any(|a| a == "--no-export");

    let mut config = SimConfig::load(Path::new(config_path))?;
    let seed = parse_arg(&args, "--seed", config.project.random_seed);
    config = config.with_seed(seed);

    let db = arg_value(&args, "--db")
        .map(str::to_string)
        .unwrap_or_else(|| config.output.db_path.clone());
    let run_id = arg_value(&args, "--run-id")
        .map(str::to_string)
        .unwrap_or_else(|| default_run_id(seed));

    println!("uplift-runner");
    println!("  config:  {config_path}");
    println!("  seed:    {seed}");
    println!("  run:     {run_id}");
    println!("  stage:   {stage}");
    println!("  db:      {db}");
    println!();

    if db != ":memory:" {
        if let Some(dir) = Path::new(&db).parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
    }
    let store = SimStore::open(&db)?;
    store.migrate()?;

    let engine = SimEngine::new(run_id.clone(), config, store)?.with_export(!no_export);

    match stage {
        "all" => {
            engine.run_all()?;
        }
        "generate" => {
            engine.generate()?;
        }
        "outcomes" => {
            engine.prepare_outcomes()?;
        }
        "kpis" => {
            engine.compute_kpis()?;
        }
        "report" => {}
        other => bail!("unknown stage '{other}' (expected all|generate|outcomes|kpis|report)"),
    }

    if matches!(stage, "all" | "kpis" | "report") {
        print_summary(&engine)?;
    }
    if let Some(lookup) = arg_value(&args, "--lookup") {
        print_lookup(&engine, lookup)?;
    }
    Ok(())
}

fn print_summary(engine: &SimEngine) -> Result<()> {
    let store = engine.store();
    let run_id = &engine.run_id;
    let z = engine.config.governance.significance_z;

    let kpis = store.load_campaign_kpis(run_id)?;
    let ranked = rank_campaigns(run_id, &kpis, z)?;
    let portfolio = portfolio_summary(run_id, &kpis)?;

    println!("=== Portfolio ===");
    println!("  Campaigns:                  {}", portfolio.n_campaigns);
    println!("  Total incremental revenue:  ${:.2}", portfolio.total_incremental_revenue);
    println!("  Mean RPC uplift:            ${:.4}", portfolio.mean_rpc_uplift);
    println!("  Mean CR uplift:             {:.4}", portfolio.mean_cr_uplift);
    println!("  Insufficient samples:       {}", portfolio.n_insufficient);
    println!();

    println!("=== Campaigns by incremental revenue ===");
    for r in &ranked {
        println!(
            "  {:>2}. {} {:<12} {:<5} {:<6} n={:>5}/{:<5} RPCΔ={:>8.4} ±{:.4}  inc=${:>10.2}  {}",
            r.rank,
            r.campaign_id,
            r.campaign_name,
            r.channel,
            r.target_segment,
            r.exposed_n,
            r.holdout_n,
            r.rpc_uplift,
            r.rpc_uplift_std_err,
            r.incremental_revenue,
            r.decision
        );
    }

    let Some(top) = ranked.first() else {
        return Ok(());
    };
    println!();
    println!("=== Drilldown: {} ({}) ===", top.campaign_id, top.decision);

    let segments = store.load_segment_kpis(run_id)?;
    for s in segment_concentration(&segments, &top.campaign_id).iter().take(5) {
        println!(
            "  {:<20} inc=${:>10.2}  n={}/{}",
            s.segment_name, s.uplift.incremental_revenue, s.exposed.n_customers, s.holdout.n_customers
        );
    }

    let light = store.load_outcomes_light(run_id)?;
    for g in group_distribution(&light, &top.campaign_id) {
        println!(
            "  {:<8} customers={:>6} converters={:>6} mean=${:.2} p95=${:.2}",
            g.group, g.customers, g.converters, g.mean_revenue, g.p95_revenue
        );
    }
    println!(
        "  Top 5% revenue share: {:.1}%",
        top_revenue_share(&light, &top.campaign_id) * 100.0
    );
    let leaders = top_customers(&light, &top.campaign_id, TOP_CUSTOMERS);
    if let Some(best) = leaders.first() {
        println!(
            "  Top customer: {} ({}) ${:.2} of {} listed",
            best.customer_id,
            best.segment_name,
            best.revenue_in_window,
            leaders.len()
        );
    }
    Ok(())
}

/// `CAMPAIGN:CUSTOMER`; a malformed customer id is reported, not fatal.
fn print_lookup(engine: &SimEngine, lookup: &str) -> Result<()> {
    let Some((campaign_id, customer)) = lookup.split_once(':') else {
        bail!("--lookup expects CAMPAIGN:CUSTOMER, got '{lookup}'");
    };
    let light = engine.store().load_outcomes_light(&engine.run_id)?;

    println!();
    match lookup_customer(&light, campaign_id, customer) {
        Ok(Some(o)) => println!(
            "  {campaign_id} / customer {}: {} exposed={} holdout={} converted={} revenue=${:.2}",
            o.customer_id, o.segment_name, o.exposed_flag, o.holdout_flag, o.converted_flag, o.revenue_in_window
        ),
        Ok(None) => println!("  Customer {} was not eligible for {campaign_id}.", customer.trim()),
        Err(e @ SimError::InvalidCustomerId { .. }) => println!("  {e}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
