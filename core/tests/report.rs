use uplift_core::{
    config::SimConfig,
    engine::SimEngine,
    error::SimError,
    report::{
        group_distribution, lookup_customer, portfolio_summary, rank_campaigns, segment_concentration,
        top_customers, top_revenue_share, TOP_CUSTOMERS,
    },
};

fn finished_engine(seed: u64) -> SimEngine {
    let engine = SimEngine::build_test(SimConfig::default_test().with_seed(seed)).unwrap();
    engine.run_all().unwrap();
    engine
}

#[test]
fn ranking_orders_by_incremental_revenue() {
    let engine = finished_engine(12);
    let kpis = engine.store().load_campaign_kpis(&engine.run_id).unwrap();
    let ranked = rank_campaigns(&engine.run_id, &kpis, 3.0).unwrap();

    assert_eq!(ranked.len(), kpis.len());
    assert_eq!(ranked[0].rank, 1);
    for pair in ranked.windows(2) {
        assert!(pair[0].incremental_revenue >= pair[1].incremental_revenue);
    }

    let portfolio = portfolio_summary(&engine.run_id, &kpis).unwrap();
    let total: f64 = ranked.iter().map(|r| r.incremental_revenue).sum();
    assert_eq!(portfolio.n_campaigns, kpis.len());
    assert!((portfolio.total_incremental_revenue - total).abs() < 1e-6);
}

#[test]
fn drilldown_views_cover_one_campaign() {
    let engine = finished_engine(13);
    let store = engine.store();
    let light = store.load_outcomes_light(&engine.run_id).unwrap();
    let segments = store.load_segment_kpis(&engine.run_id).unwrap();

    let concentration = segment_concentration(&segments, "C001");
    assert!(!concentration.is_empty());
    assert!(concentration.iter().all(|s| s.campaign_id == "C001"));
    for pair in concentration.windows(2) {
        assert!(pair[0].uplift.incremental_revenue >= pair[1].uplift.incremental_revenue);
    }

    let groups = group_distribution(&light, "C001");
    let names: Vec<&str> = groups.iter().map(|g| g.group).collect();
    assert_eq!(names, vec!["Exposed", "Holdout"]);
    let members = light.iter().filter(|o| o.campaign_id == "C001").count() as u64;
    assert_eq!(groups.iter().map(|g| g.customers).sum::<u64>(), members);
    for g in &groups {
        assert!(g.converters <= g.customers);
        assert!(g.p95_revenue >= 0.0);
    }

    let share = top_revenue_share(&light, "C001");
    assert!((0.0..=1.0).contains(&share));

    let top = top_customers(&light, "C001", TOP_CUSTOMERS);
    assert!(top.len() <= TOP_CUSTOMERS);
    for pair in top.windows(2) {
        assert!(pair[0].revenue_in_window >= pair[1].revenue_in_window);
    }
}

#[test]
fn top_share_of_a_flat_campaign_is_its_head_count_share() {
    let engine = finished_engine(14);
    let mut light = engine.store().load_outcomes_light(&engine.run_id).unwrap();
    light.retain(|o| o.campaign_id == "C002");
    let n = light.len();
    for o in &mut light {
        o.revenue_in_window = 10.0;
    }
    let cut = ((n as f64 * 0.05).floor() as usize).max(1);
    assert!((top_revenue_share(&light, "C002") - cut as f64 / n as f64).abs() < 1e-12);

    for o in &mut light {
        o.revenue_in_window = 0.0;
    }
    assert_eq!(top_revenue_share(&light, "C002"), 0.0);
}

#[test]
fn lookup_validates_the_typed_id() {
    let engine = finished_engine(15);
    let light = engine.store().load_outcomes_light(&engine.run_id).unwrap();
    let sample = light.iter().find(|o| o.campaign_id == "C003").unwrap();

    let found = lookup_customer(&light, "C003", &format!(" {} ", sample.customer_id))
        .unwrap()
        .unwrap();
    assert_eq!(found, sample);

    assert!(lookup_customer(&light, "C003", "999999").unwrap().is_none());
    assert!(matches!(
        lookup_customer(&light, "C003", "12a"),
        Err(SimError::InvalidCustomerId { .. })
    ));
}
