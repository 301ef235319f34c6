//! Simulation state shared by all stages.
//!
//! `State` replaces an untyped key-value context with named fields.
//! The dispatch outputs are filled by the external solver before the
//! hourly hooks run. The cluster-year scratch is written during year-end
//! build by exactly one stage per field and read by stages registered
//! after it; the pipeline checks that contract when it is validated.

use crate::calendar::HOURS_PER_YEAR;
use crate::study::{Area, Study, ThermalCluster};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named scratch fields of [`ClusterYearScratch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScratchField {
    ThermalClusterProductionForYear,
    ThermalClusterPMinForYear,
}

impl fmt::Display for ScratchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScratchField::ThermalClusterProductionForYear => {
                write!(f, "thermal_cluster_production_for_year")
            }
            ScratchField::ThermalClusterPMinForYear => write!(f, "thermal_cluster_pmin_for_year"),
        }
    }
}

/// Hourly dispatch results of one area, indexed by `area_wide_index`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThermalDispatch {
    /// Production of each enabled cluster for the current hour, in MWh.
    pub production: Vec<f64>,
    /// Minimum power of each enabled cluster for the current hour, in MW.
    pub pmin_of_clusters: Vec<f64>,
}

impl ThermalDispatch {
    /// Zeroed outputs sized to the enabled clusters of `area`.
    pub fn for_area(area: &Area) -> Self {
        let count = area.thermal.enabled_count();
        Self {
            production: vec![0.0; count],
            pmin_of_clusters: vec![0.0; count],
        }
    }
}

/// Year totals of the cluster currently selected during year-end build.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterYearScratch {
    /// Written by the production stage, one value per hour.
    pub thermal_cluster_production_for_year: Vec<f64>,
    /// Written by the production stage, one value per hour.
    pub thermal_cluster_pmin_for_year: Vec<f64>,
}

impl ClusterYearScratch {
    pub fn new() -> Self {
        Self {
            thermal_cluster_production_for_year: vec![0.0; HOURS_PER_YEAR],
            thermal_cluster_pmin_for_year: vec![0.0; HOURS_PER_YEAR],
        }
    }

    pub fn clear(&mut self) {
        self.thermal_cluster_production_for_year.fill(0.0);
        self.thermal_cluster_pmin_for_year.fill(0.0);
    }

    /// Read access to one field.
    pub fn field(&self, field: ScratchField) -> &[f64] {
        match field {
            ScratchField::ThermalClusterProductionForYear => {
                &self.thermal_cluster_production_for_year
            }
            ScratchField::ThermalClusterPMinForYear => &self.thermal_cluster_pmin_for_year,
        }
    }
}

impl Default for ClusterYearScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-hour and per-year context handed to every stage hook.
///
/// # Examples
///
/// ```rust
/// use adqstat::{State, Study, StudySettings};
/// use adqstat::study::ThermalCluster;
///
/// let mut study = Study::new(StudySettings::default()).unwrap();
/// let fr = study.add_area("fr");
/// study.areas[fr].thermal.add(ThermalCluster::new("gas", 2, 200.0));
///
/// let mut state = State::new(&study);
/// state.select_area(&study.areas[fr]);
/// state.thermal[fr].production[0] = 150.0;
/// state.set_hour(42);
///
/// assert_eq!(state.hour_in_the_year, 42);
/// assert_eq!(state.area.map(|a| a.name.as_str()), Some("fr"));
/// ```
#[derive(Debug, Clone)]
pub struct State<'a> {
    pub study: &'a Study,
    /// Area currently processed.
    pub area: Option<&'a Area>,
    /// Dispatch outputs, indexed by area.
    pub thermal: Vec<ThermalDispatch>,
    pub hour_in_the_year: usize,
    pub year: u32,
    pub slot: usize,
    /// Cluster currently processed during year-end build.
    pub thermal_cluster: Option<&'a ThermalCluster>,
    pub scratch: ClusterYearScratch,
}

impl<'a> State<'a> {
    pub fn new(study: &'a Study) -> Self {
        Self {
            study,
            area: None,
            thermal: study.areas.iter().map(ThermalDispatch::for_area).collect(),
            hour_in_the_year: 0,
            year: 0,
            slot: 0,
            thermal_cluster: None,
            scratch: ClusterYearScratch::new(),
        }
    }

    pub fn select_area(&mut self, area: &'a Area) {
        self.area = Some(area);
    }

    /// Set the current hour.
    ///
    /// Panics if `hour` is outside the year.
    pub fn set_hour(&mut self, hour: usize) {
        assert!(hour < HOURS_PER_YEAR, "hour {hour} out of range");
        self.hour_in_the_year = hour;
    }

    pub fn set_year(&mut self, year: u32, slot: usize) {
        self.year = year;
        self.slot = slot;
    }

    /// Select `cluster` for year-end build and clear the scratch totals.
    pub fn begin_thermal_cluster(&mut self, cluster: &'a ThermalCluster) {
        self.thermal_cluster = Some(cluster);
        self.scratch.clear();
    }
}
