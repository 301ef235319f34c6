//! Study data consumed by the pipeline.
//!
//! The study is owned by an external collaborator; this module only
//! models the parts the statistic stages read: the settings (slot count,
//! hour range, year weights, stage selection, print suppression), the
//! areas with their thermal clusters, and the links.

use crate::calendar::HOURS_PER_YEAR;
use crate::error::VariableError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive range of simulated hours within the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub first: usize,
    pub last: usize,
}

impl Default for HourRange {
    fn default() -> Self {
        Self {
            first: 0,
            last: HOURS_PER_YEAR - 1,
        }
    }
}

/// User-facing study settings.
///
/// Every field has a default, so a settings document only needs to list
/// what it changes.
///
/// # Examples
///
/// ```rust
/// use adqstat::StudySettings;
///
/// let settings = StudySettings::from_json(r#"{
///     "max_years_in_parallel": 2,
///     "nb_years": 4,
///     "year_weights": { "1": 0.5, "3": 1.5 },
///     "print_disabled": ["NODU by plant"]
/// }"#).unwrap();
///
/// assert_eq!(settings.max_years_in_parallel, 2);
/// assert_eq!(settings.year_weights.get(&3), Some(&1.5));
/// assert_eq!(settings.hour_range.last, 8759);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudySettings {
    /// Number of parallel slots (years simulated concurrently).
    pub max_years_in_parallel: usize,
    /// Number of Monte-Carlo years in the study.
    pub nb_years: u32,
    pub hour_range: HourRange,
    /// Explicit year weights; unlisted years weigh 1.
    pub year_weights: BTreeMap<u32, f64>,
    /// Years merged into the results; `None` selects every year.
    pub playlist: Option<Vec<u32>>,
    /// Captions of the stages to register, in order.
    pub stages: Vec<String>,
    /// Captions of the stages whose output is suppressed.
    pub print_disabled: Vec<String>,
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            max_years_in_parallel: 1,
            nb_years: 1,
            hour_range: HourRange::default(),
            year_weights: BTreeMap::new(),
            playlist: None,
            stages: vec!["DTG by plant".to_string(), "NODU by plant".to_string()],
            print_disabled: Vec::new(),
        }
    }
}

impl StudySettings {
    /// Parse and validate settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, VariableError> {
        let settings: StudySettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for configuration errors.
    pub fn validate(&self) -> Result<(), VariableError> {
        if self.max_years_in_parallel < 1 {
            return Err(VariableError::InvalidSlotCount(self.max_years_in_parallel));
        }
        if self.hour_range.first > self.hour_range.last || self.hour_range.last >= HOURS_PER_YEAR {
            return Err(VariableError::InvalidSettings(format!(
                "hour range {}..={} is outside the year",
                self.hour_range.first, self.hour_range.last
            )));
        }
        for (&year, &weight) in &self.year_weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(VariableError::InvalidWeight { year, weight });
            }
        }
        Ok(())
    }

    /// `true` if the stage called `caption` should be printed.
    pub fn is_printed(&self, caption: &str) -> bool {
        !self.print_disabled.iter().any(|c| c == caption)
    }
}

/// Weights of the years selected for the across-year results.
///
/// # Examples
///
/// ```rust
/// use adqstat::{StudySettings, YearWeights};
///
/// let mut settings = StudySettings::default();
/// settings.nb_years = 3;
/// settings.playlist = Some(vec![0, 2]);
/// settings.year_weights.insert(2, 3.0);
///
/// let weights = YearWeights::from_settings(&settings).unwrap();
/// assert_eq!(weights.weight(0), Some(1.0));
/// assert_eq!(weights.weight(1), None);
/// assert_eq!(weights.weight(2), Some(3.0));
/// assert_eq!(weights.total(), 4.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct YearWeights {
    weights: BTreeMap<u32, f64>,
}

impl YearWeights {
    /// Weight 1 for every year in `0..nb_years`.
    pub fn uniform(nb_years: u32) -> Self {
        Self {
            weights: (0..nb_years).map(|year| (year, 1.0)).collect(),
        }
    }

    /// Explicit weights; only the listed years are selected.
    pub fn from_map(weights: BTreeMap<u32, f64>) -> Result<Self, VariableError> {
        for (&year, &weight) in &weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(VariableError::InvalidWeight { year, weight });
            }
        }
        Ok(Self { weights })
    }

    /// Selected years of the settings with their weights.
    pub fn from_settings(settings: &StudySettings) -> Result<Self, VariableError> {
        let selected: Vec<u32> = match &settings.playlist {
            Some(years) => years
                .iter()
                .copied()
                .filter(|&year| year < settings.nb_years)
                .collect(),
            None => (0..settings.nb_years).collect(),
        };
        let weights = selected
            .into_iter()
            .map(|year| (year, settings.year_weights.get(&year).copied().unwrap_or(1.0)))
            .collect();
        Self::from_map(weights)
    }

    /// Weight of `year`, or `None` if the year is not selected.
    pub fn weight(&self, year: u32) -> Option<f64> {
        self.weights.get(&year).copied()
    }

    /// Sum of the weights of all selected years.
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// A dispatchable thermal cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalCluster {
    pub name: String,
    pub enabled: bool,
    pub unit_count: u32,
    /// Capacity of one unit, in MW.
    pub nominal_capacity: f64,
    /// Position among the enabled clusters of the area.
    pub area_wide_index: usize,
}

impl ThermalCluster {
    pub fn new(name: impl Into<String>, unit_count: u32, nominal_capacity: f64) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            unit_count,
            nominal_capacity,
            area_wide_index: 0,
        }
    }
}

/// The thermal clusters of an area, in registration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThermalClusterList {
    list: Vec<ThermalCluster>,
}

impl ThermalClusterList {
    pub fn add(&mut self, cluster: ThermalCluster) {
        self.list.push(cluster);
        self.rebuild_index();
    }

    /// Enable or disable the cluster called `name`.
    ///
    /// Returns `false` if no such cluster exists.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.list.iter_mut().find(|c| c.name == name) {
            Some(cluster) => {
                cluster.enabled = enabled;
                self.rebuild_index();
                true
            }
            None => false,
        }
    }

    pub fn each_enabled(&self) -> impl Iterator<Item = &ThermalCluster> {
        self.list.iter().filter(|c| c.enabled)
    }

    pub fn enabled_count(&self) -> usize {
        self.each_enabled().count()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    fn rebuild_index(&mut self) {
        let mut next = 0;
        for cluster in self.list.iter_mut().filter(|c| c.enabled) {
            cluster.area_wide_index = next;
            next += 1;
        }
    }
}

/// A bidding zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub index: usize,
    pub name: String,
    pub thermal: ThermalClusterList,
}

/// An interconnection between two areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub index: usize,
    pub from: usize,
    pub to: usize,
}

/// Settings plus the network topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Study {
    pub settings: StudySettings,
    pub year_weights: YearWeights,
    pub areas: Vec<Area>,
    pub links: Vec<Link>,
}

impl Study {
    /// Create a study with no areas, validating the settings.
    pub fn new(settings: StudySettings) -> Result<Self, VariableError> {
        settings.validate()?;
        let year_weights = YearWeights::from_settings(&settings)?;
        Ok(Self {
            settings,
            year_weights,
            areas: Vec::new(),
            links: Vec::new(),
        })
    }

    /// Number of parallel slots.
    pub fn max_years_in_parallel(&self) -> usize {
        self.settings.max_years_in_parallel
    }

    /// Add an area and return its index.
    pub fn add_area(&mut self, name: impl Into<String>) -> usize {
        let index = self.areas.len();
        self.areas.push(Area {
            index,
            name: name.into(),
            thermal: ThermalClusterList::default(),
        });
        index
    }

    /// Add a link between two existing areas and return its index.
    pub fn add_link(&mut self, from: usize, to: usize) -> Result<usize, VariableError> {
        if from >= self.areas.len() || to >= self.areas.len() {
            return Err(VariableError::InvalidSettings(format!(
                "link {from} -> {to} references an unknown area"
            )));
        }
        let index = self.links.len();
        self.links.push(Link { index, from, to });
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_slots_is_rejected() {
        let settings = StudySettings {
            max_years_in_parallel: 0,
            ..StudySettings::default()
        };
        assert_eq!(settings.validate(), Err(VariableError::InvalidSlotCount(0)));
        assert!(Study::new(settings).is_err());
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let json = r#"{ "nb_years": 2, "year_weights": { "1": -1.0 } }"#;
        assert_eq!(
            StudySettings::from_json(json),
            Err(VariableError::InvalidWeight {
                year: 1,
                weight: -1.0
            })
        );
    }

    #[test]
    fn test_bad_hour_range_is_rejected() {
        let json = r#"{ "hour_range": { "first": 10, "last": 8760 } }"#;
        assert!(matches!(
            StudySettings::from_json(json),
            Err(VariableError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_area_wide_index_follows_enabled_clusters() {
        let mut list = ThermalClusterList::default();
        list.add(ThermalCluster::new("a", 1, 100.0));
        list.add(ThermalCluster::new("b", 1, 100.0));
        list.add(ThermalCluster::new("c", 1, 100.0));
        assert!(list.set_enabled("b", false));

        let enabled: Vec<_> = list
            .each_enabled()
            .map(|c| (c.name.as_str(), c.area_wide_index))
            .collect();
        assert_eq!(enabled, vec![("a", 0), ("c", 1)]);
        assert_eq!(list.enabled_count(), 2);
        assert!(!list.set_enabled("missing", true));
    }

    #[test]
    fn test_playlist_outside_study_is_ignored() {
        let settings = StudySettings {
            nb_years: 2,
            playlist: Some(vec![1, 5]),
            ..StudySettings::default()
        };
        let weights = YearWeights::from_settings(&settings).unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights.weight(1), Some(1.0));
    }

    #[test]
    fn test_link_to_unknown_area() {
        let mut study = Study::new(StudySettings::default()).unwrap();
        let a = study.add_area("fr");
        assert!(study.add_link(a, 3).is_err());
        let b = study.add_area("de");
        assert_eq!(study.add_link(a, b), Ok(0));
    }
}
