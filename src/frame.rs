//! Galactocentric reference frame and the ICRS → Galactocentric transform

use crate::data::{PhaseSpace, SkyObservations};

use ndarray::{Array1, Array2, array};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Roll angle that aligns the frame's xz-plane with the Galactic plane, degrees
const ROLL0: f64 = 58.598_632_030_6;

/// Parameters of a right-handed Galactocentric Cartesian frame
///
/// The Sun is at negative `x`, `z` points to the North Galactic Pole. Defaults are the usual
/// reference values: Sgr A* position, 8.122 kpc distance, solar velocity (12.9, 245.6, 7.78) km/s
/// and a solar height of 20.8 pc.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GalactocentricFrame {
    /// ICRS right ascension of the Galactic centre, degrees
    pub galcen_ra: f64,
    /// ICRS declination of the Galactic centre, degrees
    pub galcen_dec: f64,
    /// Sun–Galactic centre distance, kpc
    pub galcen_distance: f64,
    /// Solar velocity in the Galactocentric frame, km/s
    pub galcen_v_sun: [f64; 3],
    /// Height of the Sun above the Galactic midplane, pc
    pub z_sun: f64,
    /// Extra rotation about the Sun–centre line, degrees
    pub roll: f64,
}

impl Default for GalactocentricFrame {
    fn default() -> Self {
        Self {
            galcen_ra: 266.4051,
            galcen_dec: -28.936175,
            galcen_distance: 8.122,
            galcen_v_sun: [12.9, 245.6, 7.78],
            z_sun: 20.8,
            roll: 0.0,
        }
    }
}

impl GalactocentricFrame {
    /// Copy of the frame with another solar height (pc) and vertical velocity (km/s)
    ///
    /// The in-plane components of the solar velocity are kept.
    pub fn with_solar_offset(&self, z_sun: f64, vz_sun: f64) -> Self {
        let mut frame = self.clone();
        frame.z_sun = z_sun;
        frame.galcen_v_sun[2] = vz_sun;
        frame
    }

    /// Rotation from ICRS Cartesian axes to the Galactocentric axes
    pub fn rotation(&self) -> Array2<f64> {
        let r = rotation_matrix((ROLL0 - self.roll).to_radians(), 0)
            .dot(&rotation_matrix(-self.galcen_dec.to_radians(), 1))
            .dot(&rotation_matrix(self.galcen_ra.to_radians(), 2));
        self.midplane_tilt().dot(&r)
    }

    /// Position of the barycentre in the Galactocentric frame, kpc
    pub fn solar_position(&self) -> Array1<f64> {
        -self
            .midplane_tilt()
            .dot(&array![self.galcen_distance, 0.0, 0.0])
    }

    pub fn solar_velocity(&self) -> Array1<f64> {
        Array1::from(self.galcen_v_sun.to_vec())
    }

    pub fn transform(&self, observations: &SkyObservations) -> PhaseSpace {
        let (pos, vel) = observations.icrs_cartesian();
        let rotation_t = self.rotation().reversed_axes();
        PhaseSpace {
            pos: pos.dot(&rotation_t) + &self.solar_position(),
            vel: vel.dot(&rotation_t) + &self.solar_velocity(),
        }
    }

    fn midplane_tilt(&self) -> Array2<f64> {
        let z_sun_kpc = self.z_sun * 1e-3;
        rotation_matrix(-(z_sun_kpc / self.galcen_distance).asin(), 1)
    }
}

/// Passive rotation by `angle` radians about Cartesian axis `axis` (0 = x, 1 = y, 2 = z)
fn rotation_matrix(angle: f64, axis: usize) -> Array2<f64> {
    let (s, c) = angle.sin_cos();
    let a1 = (axis + 1) % 3;
    let a2 = (axis + 2) % 3;
    let mut m = Array2::zeros((3, 3));
    m[[axis, axis]] = 1.0;
    m[[a1, a1]] = c;
    m[[a1, a2]] = s;
    m[[a2, a1]] = -s;
    m[[a2, a2]] = c;
    m
}
