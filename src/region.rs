//! Regions represent different geographical areas in which plants are located.
use crate::id::{IDCollection, define_id_getter, define_id_type};
use anyhow::{Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

define_id_type! {RegionID}

/// A map of [`Region`]s, keyed by region ID
pub type RegionMap = IndexMap<RegionID, Region>;

/// Represents a region with an ID and a longer description.
#[derive(Debug, Deserialize, PartialEq)]
pub struct Region {
    /// A unique identifier for a region (e.g. "Europe").
    pub id: RegionID,
    /// A text description of the region (e.g. "European Union and UK").
    pub description: String,
}
define_id_getter! {Region, RegionID}

/// Parse a string of regions separated by semicolons into a vector of [`RegionID`]s.
///
/// The string can be either "all" (case-insensitive), a single region, or a semicolon-separated
/// list of regions (e.g. "Europe;China" or "Europe; China")
pub fn parse_region_str(s: &str, region_ids: &IndexSet<RegionID>) -> Result<Vec<RegionID>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No regions provided");

    if s.eq_ignore_ascii_case("all") {
        return Ok(region_ids.iter().cloned().collect());
    }

    s.split(';')
        .map(|y| region_ids.get_id_by_str(y.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;

    fn region_ids() -> IndexSet<RegionID> {
        ["Europe".into(), "China".into()].into_iter().collect()
    }

    #[rstest]
    #[case("all", &["Europe", "China"])]
    #[case("ALL", &["Europe", "China"])]
    #[case("China", &["China"])]
    #[case("Europe; China", &["Europe", "China"])]
    fn test_parse_region_str_valid(#[case] input: &str, #[case] expected: &[&str]) {
        let expected: Vec<RegionID> = expected.iter().map(|&id| id.into()).collect();
        assert_eq!(parse_region_str(input, &region_ids()).unwrap(), expected);
    }

    #[rstest]
    #[case("", "No regions provided")]
    #[case("Mars", "Unknown ID Mars found")]
    fn test_parse_region_str_invalid(#[case] input: &str, #[case] msg: &str) {
        assert_error!(parse_region_str(input, &region_ids()), msg);
    }
}
