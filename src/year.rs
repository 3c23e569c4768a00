//! Parsing of year columns in input files.
use crate::input::is_sorted_and_unique;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use std::ops::RangeInclusive;

/// Parse a single year, checking that it lies within the model horizon
fn parse_single_year(s: &str, horizon: &RangeInclusive<u32>) -> Result<u32> {
    let year = s
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|year| horizon.contains(year))
        .with_context(|| format!("Invalid year: {}", s.trim()))?;
    Ok(year)
}

/// Parse a year specification into a list of years.
///
/// The string can be one of:
///
/// * "all" (case-insensitive), meaning every year of the horizon
/// * a single year (e.g. "2030")
/// * an inclusive range (e.g. "2030..2035")
/// * a semicolon-separated list (e.g. "2020;2030" or "2020; 2030")
///
/// Every year must lie within `horizon`.
pub fn parse_year_str(s: &str, horizon: &RangeInclusive<u32>) -> Result<Vec<u32>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No years provided");

    if s.eq_ignore_ascii_case("all") {
        return Ok(horizon.clone().collect());
    }

    if let Some((start, end)) = s.split_once("..") {
        let start = parse_single_year(start, horizon)?;
        let end = parse_single_year(end, horizon)?;
        ensure!(start <= end, "Invalid year range: {s}");
        return Ok((start..=end).collect());
    }

    let years: Vec<_> = s
        .split(';')
        .map(|year| parse_single_year(year, horizon))
        .try_collect()?;

    ensure!(
        is_sorted_and_unique(&years),
        "Years must be in order and unique"
    );

    Ok(years)
}
