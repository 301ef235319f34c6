//! Adequacy run example: the outer scheduler around the stage pipeline
//!
//! This example demonstrates:
//! - Loading study settings from JSON
//! - Running Monte-Carlo years in batches of parallel slots
//! - Merging each batch into the across-year results
//! - Printing the per-year survey and the digest
//!
//! Run with `RUST_LOG=debug` to see the pipeline's log output.

use adqstat::study::ThermalCluster;
use adqstat::survey::RecordKind;
use adqstat::*;

const SETTINGS: &str = r#"{
    "max_years_in_parallel": 3,
    "nb_years": 7,
    "playlist": [0, 1, 2, 3, 5, 6],
    "year_weights": { "5": 2.0 },
    "stages": ["DTG by plant", "NODU by plant"]
}"#;

/// Hourly production of `cluster` in `year`: a daily profile scaled by a
/// year-dependent load factor.
fn synthetic_production(cluster: &ThermalCluster, year: u32, hour: usize) -> f64 {
    let available = cluster.nominal_capacity * f64::from(cluster.unit_count);
    let daily = ((hour % 24) as f64 - 12.0).abs() / 12.0;
    let yearly = 0.5 + 0.1 * f64::from(year % 4);
    (available * yearly * (1.0 - 0.5 * daily)).round()
}

fn run_year(pipeline: &mut Pipeline, study: &Study, year: u32, slot: usize) {
    let area = &study.areas[0];
    let mut state = State::new(study);
    state.select_area(area);
    state.set_year(year, slot);

    pipeline.year_begin(year, slot);
    for hour in 0..8760 {
        state.set_hour(hour);
        for cluster in area.thermal.each_enabled() {
            let production = synthetic_production(cluster, year, hour);
            state.thermal[area.index].production[cluster.area_wide_index] = production;
            state.thermal[area.index].pmin_of_clusters[cluster.area_wide_index] =
                cluster.nominal_capacity * 0.2;
        }
        pipeline.hour_begin(hour);
        pipeline.hour_for_each_area(&state, slot);
    }
    pipeline.year_end_build(&mut state, year, slot);
    pipeline.year_end(year, slot);
}

fn main() -> Result<(), VariableError> {
    env_logger::init();

    println!("=== Adequacy Run Demo ===\n");

    let mut study = Study::new(StudySettings::from_json(SETTINGS)?)?;
    let fr = study.add_area("fr");
    study.areas[fr].thermal.add(ThermalCluster::new("nuclear", 4, 900.0));
    study.areas[fr].thermal.add(ThermalCluster::new("ccgt", 6, 400.0));
    study.areas[fr].thermal.add(ThermalCluster::new("peaker", 10, 50.0));
    study.areas[fr].thermal.set_enabled("peaker", false);

    let mut pipeline = Pipeline::from_settings(&study.settings)?;
    pipeline.initialize_from_study(&study)?;
    pipeline.initialize_from_area(&study, &study.areas[fr])?;
    pipeline.verify_area(&study.areas[fr])?;

    println!("Stages:");
    for stage in pipeline.stages() {
        let d = stage.descriptor();
        println!("  {} ({}) - {} columns", d.caption, d.unit, stage.column_count());
    }
    println!("Memory: {} bytes\n", pipeline.memory_usage());

    // ===== Years in slot batches =====
    let slots = study.max_years_in_parallel();
    let years: Vec<u32> = (0..study.settings.nb_years).collect();
    pipeline.simulation_begin();
    for batch in years.chunks(slots) {
        let mut slot_to_year = SlotYearMap::new();
        for (slot, &year) in batch.iter().enumerate() {
            run_year(&mut pipeline, &study, year, slot);
            slot_to_year.insert(slot, year);
        }

        let mut annual = SurveyReport::default();
        SurveyReportBuilder::new(&pipeline).annual_survey(
            &mut annual,
            FileLevel::DETAILS,
            Precision::ANNUAL,
            0,
        );
        for record in annual.for_stage("DTG by plant") {
            println!("  year {} {:>8}: {:>12} MWh", batch[0], record.caption, record.values[0]);
        }

        pipeline.compute_summary(&slot_to_year, batch.len())?;
    }
    pipeline.simulation_end();

    // ===== Digest =====
    println!("\nDigest (years {:?}):", study.settings.playlist);
    let mut digest = SurveyReport::default();
    SurveyReportBuilder::new(&pipeline).digest(&mut digest, FileLevel::DETAILS, DataLevel::AREA);
    for record in &digest.records {
        if let RecordKind::Digest { results } = &record.kind {
            let name = record.entity.as_deref().unwrap_or("total");
            println!(
                "  {:<14} {:>8} {:?} = {:?} {}",
                record.stage, name, results, record.values, record.unit
            );
        }
    }

    Ok(())
}
