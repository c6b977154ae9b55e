//! End-to-end planning runs on a small two-node fixture.
//!
//! Node 0 carries a 200 MW legacy unit, node 1 is load-only, and a 400 MW
//! existing corridor joins them. Peak load is 150 + 100 MW, so every
//! feasible plan has to add at least 50 MW somewhere.

use gep_core::{
    Line, NodeId, OperatingContexts, Params, ScenarioSet, StateSet, System, TechId, Technology,
    TimeGrid,
};
use gep_milp::DisjunctionMode;
use gep_plan::{plan, plan_two_level, PlanError, PlanModel, PlanOptions, ReportStatus};

const NG: usize = 0;
const LEGACY: usize = 1;

fn base_system() -> System {
    let techs = vec![
        Technology::expandable("ng-new", 10.0, 500.0),
        Technology::existing("legacy-coal"),
    ];
    let lines = vec![Line::existing("n0-n1", NodeId(0), NodeId(1), 400.0)];
    let mut params = Params::zeros(2, 2, 1, 1, 1, 2);
    for b in 0..2 {
        params.demand.set([0, 0, 0, b], 150.0);
        params.demand.set([1, 0, 0, b], 100.0);
    }
    params.legacy_gen.set([0, LEGACY], 200.0);
    params.unit_invest_gen.set([NG, 0], 0.1);
    params.unit_fixed_gen.set([NG, 0], 0.01);
    params.unit_var_gen.set([NG, 0], 30.0);
    params.unit_var_gen.set([LEGACY, 0], 10.0);
    System {
        nodes: 2,
        techs,
        lines,
        time: TimeGrid::new(1, vec![365.0], vec![12.0, 12.0]),
        params,
        contexts: OperatingContexts::Deterministic,
        excluded_sites: vec![],
    }
}

fn opts() -> PlanOptions {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init()
        .ok();
    PlanOptions::default()
}

#[test]
fn deterministic_plan_covers_the_capacity_gap() {
    let sys = base_system();
    let report = plan(&sys, &opts()).unwrap();
    assert_eq!(report.status, ReportStatus::Optimal);
    // 250 MW of load against 200 MW legacy
    assert!(report.total_gen_added_mw() >= 50.0 - 1e-4);
    // nothing forces more than the gap
    assert!(report.total_gen_added_mw() <= 50.0 + 0.1);
    assert!(report.costs.invest_gen > 0.0);
    assert!(report.tlole.is_empty());
}

#[test]
fn undersized_candidates_make_the_plan_infeasible() {
    let mut sys = base_system();
    sys.techs[NG] = Technology::expandable("ng-new", 1.0, 10.0);
    let err = plan(&sys, &opts()).unwrap_err();
    assert!(matches!(err, PlanError::UpperInfeasible));
}

#[test]
fn sizing_window_forces_lumpy_installs() {
    let mut sys = base_system();
    // gap is 50 MW but anything built must be at least 120 MW
    sys.techs[NG] = Technology::expandable("ng-new", 120.0, 500.0);
    let report = plan(&sys, &opts()).unwrap();
    for g in &report.gen_installs {
        assert!(
            g.capacity_mw >= 120.0 - 1e-4,
            "install below the sizing window: {} MW",
            g.capacity_mw
        );
    }
    assert!(report.total_gen_added_mw() >= 120.0 - 1e-4);
}

#[test]
fn excluded_site_is_never_built() {
    let mut sys = base_system();
    sys.excluded_sites.push((NodeId(1), TechId(NG)));
    let report = plan(&sys, &opts()).unwrap();
    assert!(report
        .gen_installs
        .iter()
        .all(|g| !(g.node == 1 && g.tech == NG)));
    assert!(report.total_gen_added_mw() >= 50.0 - 1e-4);
}

#[test]
fn reserve_margin_demands_spare_capacity() {
    let mut sys = base_system();
    sys.contexts = OperatingContexts::ReserveMargin;
    let report = plan(&sys, &opts()).unwrap();
    // node 1 alone needs 25 MW of local reserve on top of the energy gap
    let deterministic = plan(&base_system(), &opts()).unwrap();
    assert!(report.total_gen_added_mw() > deterministic.total_gen_added_mw() + 1e-4);
}

#[test]
fn corridor_outage_scenario_forces_local_generation() {
    let mut sys = base_system();
    let mut scenarios = ScenarioSet::intact(2, 2, 2, 1, 1, 2);
    for p in 0..1 {
        for b in 0..2 {
            scenarios.line_survival.set([1, 0, p, b], 0.0);
        }
    }
    scenarios.rates = vec![1.0, 0.1];
    sys.contexts = OperatingContexts::Contingency(scenarios);
    let report = plan(&sys, &opts()).unwrap();
    // with the corridor down, node 1 must carry its own 100 MW
    let at_node_1: f64 = report
        .gen_installs
        .iter()
        .filter(|g| g.node == 1)
        .map(|g| g.capacity_mw)
        .sum();
    assert!(at_node_1 >= 100.0 - 1e-4);
}

fn failure_states() -> StateSet {
    // state 1: the legacy unit is lost everywhere
    let mut states = StateSet::intact(vec![0.999, 0.001], 2, 2, 1);
    states.gen_survival.set([1, 0, LEGACY], 0.0);
    states.gen_survival.set([1, 1, LEGACY], 0.0);
    states
}

fn probabilistic_system() -> System {
    let mut sys = base_system();
    sys.params.backup_min_install = vec![10.0, 0.0];
    sys.params.backup_max_install = vec![100.0, 0.0];
    sys.params.unit_invest_backup.set([NG, 0], 0.05);
    sys.contexts = OperatingContexts::Probabilistic(failure_states());
    sys
}

#[test]
fn probabilistic_plan_keeps_lole_under_the_cap() {
    let sys = probabilistic_system();
    let report = plan(&sys, &opts()).unwrap();
    assert_eq!(report.tlole.len(), 1);
    // any shedding event in a subperiod would already cost
    // 0.001 * 365 * 12 = 4.38 h, above the 2.4 h cap, so the plan must
    // carry the full load through the legacy outage
    assert!(report.tlole[0] <= 2.4 + 1e-6);
    assert!(report.teens[0] <= 1e-3);
    let covering = report.total_gen_added_mw()
        + report
            .backup_installs
            .iter()
            .map(|g| g.capacity_mw)
            .sum::<f64>();
    assert!(covering >= 250.0 - 1e-3);
    assert!(report.warnings.is_empty());
}

#[test]
fn two_level_freezes_the_design_and_measures_adequacy() {
    let sys = base_system();
    let result = plan_two_level(&sys, failure_states(), &opts()).unwrap();

    // the frozen design matches the deterministic plan
    assert!((result.design.total_gen_added_mw() - 50.0).abs() < 0.1);
    assert!(
        (result.adequacy.total_gen_added_mw() - result.design.total_gen_added_mw()).abs() < 1e-4
    );
    // no backup in the design stage, so none in the adequacy stage either
    assert!(result.adequacy.backup_installs.is_empty());

    // 50 MW survives the outage, 200 MW is shed for 24 h of the
    // representative day, weighted by state probability and day count
    let expected_teens = 0.001 * 365.0 * 24.0 * 200.0;
    assert!((result.adequacy.teens[0] - expected_teens).abs() < 5.0);
    // the 200 MW shortfall exceeds either node's demand, so both nodes
    // shed and both count the full 24 h
    let expected_tlole = 2.0 * 0.001 * 365.0 * 24.0;
    assert!((result.adequacy.tlole[0] - expected_tlole).abs() < 1e-2);
}

#[test]
fn probabilistic_upper_collapses_to_single_level() {
    let sys = probabilistic_system();
    let result = plan_two_level(&sys, failure_states(), &opts()).unwrap();
    assert_eq!(result.design.objective, result.adequacy.objective);
}

#[test]
fn model_construction_is_deterministic() {
    let sys = probabilistic_system();
    let a = PlanModel::build(&sys, DisjunctionMode::BigM, true).unwrap();
    let b = PlanModel::build(&sys, DisjunctionMode::BigM, true).unwrap();
    assert_eq!(a.model.var_count(), b.model.var_count());
    assert_eq!(a.model.constraint_count(), b.model.constraint_count());
}

#[test]
fn capacity_persists_across_years() {
    // demand grows 250 -> 350; year-0 installs keep serving year 1, so
    // only the increment is added
    let mut sys = base_system();
    sys.time = TimeGrid::new(2, vec![365.0], vec![12.0, 12.0]);
    sys.params = {
        let mut p = Params::zeros(2, 2, 1, 2, 1, 2);
        for t in 0..2 {
            for b in 0..2 {
                p.demand.set([0, t, 0, b], 150.0 + 100.0 * t as f64);
                p.demand.set([1, t, 0, b], 100.0);
            }
            p.unit_invest_gen.set([NG, t], 0.1);
            p.unit_var_gen.set([NG, t], 30.0);
            p.unit_var_gen.set([LEGACY, t], 10.0);
        }
        p.legacy_gen.set([0, LEGACY], 200.0);
        p
    };
    let report = plan(&sys, &opts()).unwrap();
    // 50 MW gap in year 0, 100 MW more in year 1
    assert!((report.total_gen_added_mw() - 150.0).abs() < 0.1);
    let year1: f64 = report
        .gen_installs
        .iter()
        .filter(|g| g.year == 1)
        .map(|g| g.capacity_mw)
        .sum();
    assert!((year1 - 100.0).abs() < 0.1);
}

#[test]
fn dead_unit_dispatches_nothing() {
    // scenario 1 wipes out the candidate at node 1; its dispatch there
    // must be exactly zero even though min_depth is zero
    let mut sys = base_system();
    let mut scenarios = ScenarioSet::intact(2, 2, 2, 1, 1, 2);
    for b in 0..2 {
        scenarios.gen_survival.set([1, 1, NG, 0, b], 0.0);
    }
    sys.contexts = OperatingContexts::Contingency(scenarios);
    let plan_model = PlanModel::build(&sys, DisjunctionMode::BigM, true).unwrap();
    let outcome = gep_plan::solve_model(&plan_model, &opts().solver).unwrap();
    assert!(outcome.status.has_solution());
    for b in 0..2 {
        let v = plan_model.vars.dispatch[&(1, 1, NG, 0, 0, b)];
        assert!(outcome.values[v.0].abs() < 1e-6);
    }
}

#[test]
fn lole_accrues_per_shedding_node() {
    // state 1 takes out the legacy unit at both nodes at once; each node
    // sheds its own load, and each one counts the full subperiod duration
    let techs = vec![Technology::existing("legacy-coal")];
    let lines = vec![Line::existing("n0-n1", NodeId(0), NodeId(1), 400.0)];
    let mut params = Params::zeros(2, 1, 1, 1, 1, 2);
    for b in 0..2 {
        params.demand.set([0, 0, 0, b], 100.0);
        params.demand.set([1, 0, 0, b], 100.0);
    }
    params.legacy_gen.set([0, 0], 100.0);
    params.legacy_gen.set([1, 0], 100.0);
    // no candidates exist, so the cap must leave room for the outage
    params.lole_cap = 100.0;
    let mut states = StateSet::intact(vec![0.999, 0.001], 2, 1, 1);
    states.gen_survival.set([1, 0, 0], 0.0);
    states.gen_survival.set([1, 1, 0], 0.0);
    let sys = System {
        nodes: 2,
        techs,
        lines,
        time: TimeGrid::new(1, vec![365.0], vec![12.0, 12.0]),
        params,
        contexts: OperatingContexts::Probabilistic(states),
        excluded_sites: vec![],
    };
    let report = plan(&sys, &opts()).unwrap();
    // two nodes losing load through both subperiods of the day
    let expected_tlole = 2.0 * 0.001 * 365.0 * 24.0;
    assert!((report.tlole[0] - expected_tlole).abs() < 1e-2);
    let expected_teens = 0.001 * 365.0 * 24.0 * 200.0;
    assert!((report.teens[0] - expected_teens).abs() < 1.0);
}

#[test]
fn fixed_cost_accrues_on_surviving_capacity() {
    // the unit is lost with probability 0.001, so its fixed cost applies
    // to 0.999 of the 200 MW
    let techs = vec![Technology::existing("legacy-coal")];
    let mut params = Params::zeros(1, 1, 0, 1, 1, 2);
    for b in 0..2 {
        params.demand.set([0, 0, 0, b], 100.0);
    }
    params.legacy_gen.set([0, 0], 200.0);
    params.unit_fixed_gen.set([0, 0], 1.0);
    params.lole_cap = 100.0;
    let mut states = StateSet::intact(vec![0.999, 0.001], 1, 1, 0);
    states.gen_survival.set([1, 0, 0], 0.0);
    let sys = System {
        nodes: 1,
        techs,
        lines: vec![],
        time: TimeGrid::new(1, vec![365.0], vec![12.0, 12.0]),
        params,
        contexts: OperatingContexts::Probabilistic(states),
        excluded_sites: vec![],
    };
    let report = plan(&sys, &opts()).unwrap();
    assert!((report.costs.fixed_gen - 0.999 * 200.0).abs() < 1e-6);
}

#[test]
fn ramping_respects_scenario_survival() {
    // half the unit survives scenario 1, halving the cold-start ramp room:
    // 0.25 * 0.5 * 200 = 25 MW in the first subperiod
    let mk = |demand: f64| {
        let techs = vec![Technology::existing("peaker").with_ramps(0.25, 0.25)];
        let mut params = Params::zeros(1, 1, 0, 1, 1, 2);
        for b in 0..2 {
            params.demand.set([0, 0, 0, b], demand);
        }
        params.legacy_gen.set([0, 0], 200.0);
        let mut scenarios = ScenarioSet::intact(2, 1, 1, 0, 1, 2);
        for b in 0..2 {
            scenarios.gen_survival.set([1, 0, 0, 0, b], 0.5);
        }
        System {
            nodes: 1,
            techs,
            lines: vec![],
            time: TimeGrid::new(1, vec![365.0], vec![12.0, 12.0]),
            params,
            contexts: OperatingContexts::Contingency(scenarios),
            excluded_sites: vec![],
        }
    };
    let err = plan(&mk(40.0), &opts()).unwrap_err();
    assert!(matches!(err, PlanError::UpperInfeasible));
    plan(&mk(20.0), &opts()).unwrap();
}

#[test]
fn reserve_split_follows_the_load_shape() {
    let mut sys = base_system();
    sys.contexts = OperatingContexts::ReserveMargin;
    // the evening subperiod carries much less load
    sys.params.demand.set([0, 0, 0, 1], 60.0);
    sys.params.demand.set([1, 0, 0, 1], 40.0);
    let model = PlanModel::build(&sys, DisjunctionMode::BigM, true).unwrap();
    let outcome = gep_plan::solve_model(&model, &opts().solver).unwrap();
    assert!(outcome.status.has_solution());
    // each subperiod holds its own reserve against its own demand
    for n in 0..2 {
        for b in 0..2 {
            let demand = sys.params.demand.get([n, 0, 0, b]);
            let reserved: f64 = (0..2)
                .map(|k| outcome.values[model.vars.cap_rev[&(n, k, 0, 0, b)].0])
                .sum();
            assert!(
                reserved >= 0.25 * demand - 1e-4,
                "node {n} sub {b}: reserved {reserved} against demand {demand}"
            );
        }
    }
}

#[test]
fn backup_inherits_the_operating_window() {
    // the candidate runs at half depth, and so does its backup: covering
    // the 250 MW outage with 100 MW of backup per node takes 300 MW of
    // main capacity, not the 167 MW a full-depth backup would allow
    let mut sys = probabilistic_system();
    sys.techs[NG] = Technology::expandable("ng-new", 10.0, 500.0).with_depth(0.0, 0.5);
    let report = plan(&sys, &opts()).unwrap();
    assert!((report.total_gen_added_mw() - 300.0).abs() < 1.0);
}

#[test]
fn portfolio_flag_controls_renewable_build() {
    let windy = || {
        let techs = vec![
            Technology::expandable("ng-new", 10.0, 500.0),
            Technology::existing("legacy-coal"),
            Technology::renewable("wind", 10.0, 500.0),
        ];
        let lines = vec![Line::existing("n0-n1", NodeId(0), NodeId(1), 400.0)];
        let mut params = Params::zeros(2, 3, 1, 1, 1, 2);
        for b in 0..2 {
            params.demand.set([0, 0, 0, b], 150.0);
            params.demand.set([1, 0, 0, b], 100.0);
        }
        // wind blows in the first subperiod only
        params.capacity_factor.set([0, 0, 0, 0], 1.0);
        params.capacity_factor.set([1, 0, 0, 0], 1.0);
        params.legacy_gen.set([0, LEGACY], 200.0);
        params.unit_invest_gen.set([NG, 0], 0.1);
        // dearer than any fuel saving, so wind only appears when required
        params.unit_invest_gen.set([2, 0], 0.3);
        params.unit_var_gen.set([NG, 0], 30.0);
        params.unit_var_gen.set([LEGACY, 0], 10.0);
        params.res_target = vec![0.4];
        System {
            nodes: 2,
            techs,
            lines,
            time: TimeGrid::new(1, vec![365.0], vec![20.0, 4.0]),
            params,
            contexts: OperatingContexts::Deterministic,
            excluded_sites: vec![],
        }
    };

    // the share compares plain sums over the sampled subperiods: the target
    // is 0.4 * 500 = 200 MWh of wind out of one windy subperiod
    let on = plan(&windy(), &opts()).unwrap();
    let wind_mw: f64 = on
        .gen_installs
        .iter()
        .filter(|g| g.tech == 2)
        .map(|g| g.capacity_mw)
        .sum();
    assert!((wind_mw - 200.0).abs() < 1.0);

    // opting out drops the requirement and the plan skips wind entirely
    let off = plan(
        &windy(),
        &PlanOptions {
            renewable_portfolio: false,
            ..opts()
        },
    )
    .unwrap();
    assert!(off.gen_installs.iter().all(|g| g.tech != 2));
    assert!(off.objective < on.objective - 1.0);
}

#[test]
fn report_round_trips_through_json() {
    let report = plan(&base_system(), &opts()).unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("gen_installs"));
    assert!(json.contains("invest_gen"));
}

#[test]
fn hull_reformulation_reaches_the_same_plan() {
    let sys = base_system();
    let bigm = plan(&sys, &opts()).unwrap();
    let hull = plan(
        &sys,
        &PlanOptions {
            reformulation: DisjunctionMode::Hull,
            ..PlanOptions::default()
        },
    )
    .unwrap();
    assert!((bigm.objective - hull.objective).abs() < 0.05);
}
