//! End-to-end runs of small but complete models.

use float_cmp::approx_eq;
use gpsim::{BlockKind, Config, Model, ProcessDef};
use std::io::Cursor;

/// A single-server queue: customers arrive every 10 time units, wait in
/// LINE for the CHAIR, are served for `service_time`, and leave.
fn barbershop(service_time: &str) -> Model {
    Model::builder()
        .termination_count(5)
        .process(
            ProcessDef::new("customers")
                .block(BlockKind::generate("10", "", "", "5", ""))
                .block(BlockKind::enqueue("LINE"))
                .block(BlockKind::seize("CHAIR"))
                .block(BlockKind::depart("LINE"))
                .block(BlockKind::advance(service_time, ""))
                .block(BlockKind::release("CHAIR"))
                .block(BlockKind::terminate("1")),
        )
        .build()
        .unwrap()
}

#[test]
fn test_uncongested_shop_has_no_waiting() {
    let mut model = barbershop("8");
    model.execute(false).unwrap();

    assert_eq!(model.termination_count(), 0);
    assert_eq!(model.clock(), 58.0);

    let line = model.queue("LINE").unwrap();
    assert_eq!(line.total_entries(), 5);
    assert_eq!(line.max_count(), 1);
    assert_eq!(line.current_count(), 0);
    assert_eq!(line.zero_entries(), 5);
    assert_eq!(line.average_wait(false), 0.0);
    assert!(approx_eq!(f32, line.percent_zero_entries(), 100.0, ulps = 2));

    let chair = model.facility("CHAIR").unwrap();
    assert_eq!(chair.capture_count(), 5);
    assert_eq!(chair.owner(), None);
    assert!(approx_eq!(f32, chair.total_holding_time(), 40.0, ulps = 2));
    assert!(approx_eq!(f32, chair.average_holding_time(), 8.0, ulps = 2));
}

#[test]
fn test_congested_shop_accumulates_waiting_time() {
    let mut model = barbershop("15");
    model.execute(false).unwrap();

    assert_eq!(model.termination_count(), 0);
    assert_eq!(model.clock(), 85.0);

    // Service slots start at 10, 25, 40, 55, 70 against arrivals at
    // 10, 20, 30, 40, 50, so the waits total 50 across 5 customers.
    let line = model.queue("LINE").unwrap();
    assert_eq!(line.total_entries(), 5);
    assert_eq!(line.max_count(), 2);
    assert_eq!(line.current_count(), 0);
    assert_eq!(line.zero_entries(), 2);
    assert!(approx_eq!(f32, line.average_wait(false), 10.0, ulps = 2));
    assert!(approx_eq!(f32, line.average_wait(true), 50.0 / 3.0, ulps = 2));
    assert!(approx_eq!(f32, line.percent_zero_entries(), 40.0, ulps = 2));
    assert!(approx_eq!(f32, line.average_content(model.clock()), 50.0 / 85.0, ulps = 2));

    let chair = model.facility("CHAIR").unwrap();
    assert_eq!(chair.capture_count(), 5);
    assert!(approx_eq!(f32, chair.total_holding_time(), 75.0, ulps = 2));
    assert!(approx_eq!(f32, chair.average_holding_time(), 15.0, ulps = 2));
}

#[test]
fn test_storage_occupancy() {
    let mut model = Model::builder()
        .termination_count(2)
        .storage("TANK", 3)
        .process(
            ProcessDef::new("fillers")
                .block(BlockKind::generate("10", "", "", "2", ""))
                .block(BlockKind::enter("TANK", "2"))
                .block(BlockKind::advance("15", ""))
                .block(BlockKind::leave("TANK", "2"))
                .block(BlockKind::terminate("1")),
        )
        .build()
        .unwrap();
    model.execute(false).unwrap();

    // The second filler needs 2 units with only 1 free, so it waits from 20
    // until the first leaves at 25; the run ends at 40.
    assert_eq!(model.termination_count(), 0);
    assert_eq!(model.clock(), 40.0);
    let tank = model.storage("TANK").unwrap();
    assert_eq!(tank.current_usage(), 0);
    assert_eq!(tank.entry_count(), 4);
    assert!(tank.is_empty());
    assert!(approx_eq!(f32, tank.average_usage(model.clock()), 1.5, ulps = 2));
}

#[test]
fn test_displaced_owner_resumes_through_its_destination() {
    let mut model = Model::builder()
        .termination_count(2)
        .process(
            ProcessDef::new("owner")
                .block(BlockKind::generate("0", "", "", "1", ""))
                .block(BlockKind::seize("F1"))
                .labeled_block("ADV1", BlockKind::advance("20", ""))
                .block(BlockKind::release("F1"))
                .block(BlockKind::terminate("1")),
        )
        .process(
            ProcessDef::new("outage")
                .block(BlockKind::generate("5", "", "", "1", ""))
                .block(BlockKind::funavail("F1", None, "ADV1", "RES", None, "ADV1"))
                .block(BlockKind::terminate("1")),
        )
        .build()
        .unwrap();
    model.execute(false).unwrap();

    // The owner is displaced at 5 with residual 15, restored to the future
    // chain at 20, rerouted through ADV1, and finishes at 40.
    assert_eq!(model.termination_count(), 0);
    assert_eq!(model.clock(), 40.0);
    let facility = model.facility("F1").unwrap();
    assert_eq!(facility.owner(), None);
    assert_eq!(facility.capture_count(), 1);
    assert!(approx_eq!(f32, facility.total_holding_time(), 40.0, ulps = 2));
    assert!(!facility.is_available());
}

#[test]
fn test_model_from_config() -> anyhow::Result<()> {
    let config = Config::from_yaml(Cursor::new("termination_count: 3\nseed: 17"))?;
    let mut model = Model::builder()
        .config(&config)
        .process(
            ProcessDef::new("arrivals")
                .block(BlockKind::generate("10", "4", "", "3", ""))
                .block(BlockKind::terminate("1")),
        )
        .build()?;
    model.execute(false)?;
    assert_eq!(model.termination_count(), 0);
    // Spread keeps every inter-arrival inside [6, 14].
    assert!(model.clock() >= 6.0 && model.clock() <= 42.0);
    Ok(())
}

#[test]
fn test_entity_reports_serialize() {
    let mut model = barbershop("8");
    model.execute(false).unwrap();

    let chair = serde_json::to_value(model.facility("CHAIR").unwrap()).unwrap();
    assert_eq!(chair["capture_count"], 5);
    assert_eq!(chair["available"], true);

    let line = serde_json::to_value(model.queue("LINE").unwrap()).unwrap();
    assert_eq!(line["total_entries"], 5);
    assert_eq!(line["max_count"], 1);
    assert!(line["records"].as_array().unwrap().len() == 5);
}
