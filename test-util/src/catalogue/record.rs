use serde::{Deserialize, Serialize};

pub const ID_COLUMN: &str = "APOGEE_ID";

/// Abundance measured for every fixture star, its uncertainty is in `MG_FE_ERR`
pub const ABUNDANCE_COLUMN: &str = "MG_FE";

/// One row of a fixture catalogue
///
/// Angles in degrees, distance in kpc, proper motions in mas/yr, radial velocity in km/s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StarRecord {
    #[serde(rename = "APOGEE_ID")]
    pub apogee_id: String,
    pub ra: f64,
    pub dec: f64,
    pub distance: f64,
    pub pm_ra_cosdec: f64,
    pub pm_dec: f64,
    pub radial_velocity: f64,
    #[serde(rename = "MG_FE")]
    pub mg_fe: f64,
    #[serde(rename = "MG_FE_ERR")]
    pub mg_fe_err: f64,
}
