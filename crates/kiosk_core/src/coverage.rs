use std::collections::{BTreeMap, HashSet};

use shared::domain::{Region, RegionStatus};

pub type RegionStatusMap = BTreeMap<Region, RegionStatus>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageSummary {
    pub required: usize,
    pub detected: usize,
    pub missing: usize,
    pub missing_regions: Vec<Region>,
}

impl CoverageSummary {
    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }
}

fn lowercase_set<S: AsRef<str>>(classes: &[S]) -> HashSet<String> {
    classes
        .iter()
        .map(|class| class.as_ref().trim().to_lowercase())
        .collect()
}

fn region_matches(region: Region, classes: &HashSet<String>) -> bool {
    region
        .synonyms()
        .iter()
        .any(|synonym| classes.contains(&synonym.to_lowercase()))
}

pub fn compute_region_statuses<D, R>(detected: &[D], required: &[R]) -> RegionStatusMap
where
    D: AsRef<str>,
    R: AsRef<str>,
{
    let detected = lowercase_set(detected);
    let required = lowercase_set(required);

    Region::ALL
        .into_iter()
        .map(|region| {
            let status = if !region_matches(region, &required) {
                RegionStatus::NotRequired
            } else if region_matches(region, &detected) {
                RegionStatus::RequiredAndDetected
            } else {
                RegionStatus::RequiredAndMissing
            };
            (region, status)
        })
        .collect()
}

pub fn summarize(statuses: &RegionStatusMap) -> CoverageSummary {
    let mut summary = CoverageSummary::default();
    for (region, status) in statuses {
        if status.is_required() {
            summary.required += 1;
        }
        match status {
            RegionStatus::NotRequired => {}
            RegionStatus::RequiredAndDetected => summary.detected += 1,
            RegionStatus::RequiredAndMissing => {
                summary.missing += 1;
                summary.missing_regions.push(*region);
            }
        }
    }
    summary
}

pub fn missing_equipment<D, R>(detected: &[D], required: &[R]) -> Vec<String>
where
    D: AsRef<str>,
    R: AsRef<str>,
{
    let detected = lowercase_set(detected);
    let mut seen = HashSet::new();
    required
        .iter()
        .map(|class| class.as_ref().trim())
        .filter(|class| !class.is_empty())
        .filter(|class| !detected.contains(&class.to_lowercase()))
        .filter(|class| seen.insert(class.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "tests/coverage_tests.rs"]
mod tests;
