use crate::catalogue::record::StarRecord;
use crate::catalogue::records_from_reader;

use lazy_static::lazy_static;

/// Sixteen APOGEE-like stars within a few kpc of the Sun
// Relative to the current file
pub const MINI_CATALOGUE_CSV: &str = include_str!("../../../test-data/catalogues/mini-apogee.csv");

lazy_static! {
    pub static ref MINI_CATALOGUE: Vec<StarRecord> =
        records_from_reader(MINI_CATALOGUE_CSV.as_bytes()).unwrap();
}
