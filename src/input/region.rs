//! Code for reading region-related information from CSV files.
use super::{InputFiles, read_csv_id_file};
use crate::region::RegionMap;
use anyhow::Result;

const REGIONS_FILE_NAME: &str = "regions.csv";

/// Reads regions from a CSV file.
///
/// # Arguments
///
/// * `files` - The model's input files
///
/// # Returns
///
/// A [`RegionMap`] with the parsed regions data or an error
pub fn read_regions(files: &InputFiles) -> Result<RegionMap> {
    read_csv_id_file(&files.path(REGIONS_FILE_NAME))
}
