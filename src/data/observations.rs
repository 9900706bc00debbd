use crate::error::TableError;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Conversion factor from kpc·mas/yr to km/s
pub const KMS_PER_KPC_MAS_YR: f64 = 4.740_470_463_533_348;

/// ICRS astrometry of a set of stars
///
/// Angles are in degrees, `distance` in kpc, proper motions in mas/yr, `radial_velocity` in km/s.
/// `pm_ra_cosdec` already includes the `cos(dec)` factor.
#[derive(Clone, Debug, PartialEq)]
pub struct SkyObservations {
    pub ra: Array1<f64>,
    pub dec: Array1<f64>,
    pub distance: Array1<f64>,
    pub pm_ra_cosdec: Array1<f64>,
    pub pm_dec: Array1<f64>,
    pub radial_velocity: Array1<f64>,
}

impl SkyObservations {
    pub fn new(
        ra: impl Into<Array1<f64>>,
        dec: impl Into<Array1<f64>>,
        distance: impl Into<Array1<f64>>,
        pm_ra_cosdec: impl Into<Array1<f64>>,
        pm_dec: impl Into<Array1<f64>>,
        radial_velocity: impl Into<Array1<f64>>,
    ) -> Result<Self, TableError> {
        let obs = Self {
            ra: ra.into(),
            dec: dec.into(),
            distance: distance.into(),
            pm_ra_cosdec: pm_ra_cosdec.into(),
            pm_dec: pm_dec.into(),
            radial_velocity: radial_velocity.into(),
        };
        let expected = obs.ra.len();
        for (name, column) in obs.columns() {
            if column.len() != expected {
                return Err(TableError::LengthMismatch {
                    name: name.to_owned(),
                    actual: column.len(),
                    expected,
                });
            }
        }
        Ok(obs)
    }

    pub fn len(&self) -> usize {
        self.ra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }

    pub fn columns(&self) -> [(&'static str, ArrayView1<'_, f64>); 6] {
        [
            ("ra", self.ra.view()),
            ("dec", self.dec.view()),
            ("distance", self.distance.view()),
            ("pm_ra_cosdec", self.pm_ra_cosdec.view()),
            ("pm_dec", self.pm_dec.view()),
            ("radial_velocity", self.radial_velocity.view()),
        ]
    }

    /// Barycentric ICRS Cartesian positions (kpc) and velocities (km/s), one row per star
    pub fn icrs_cartesian(&self) -> (Array2<f64>, Array2<f64>) {
        let n = self.len();
        let mut pos = Array2::zeros((n, 3));
        let mut vel = Array2::zeros((n, 3));
        for i in 0..n {
            let (sin_ra, cos_ra) = self.ra[i].to_radians().sin_cos();
            let (sin_dec, cos_dec) = self.dec[i].to_radians().sin_cos();
            let r_hat = [cos_dec * cos_ra, cos_dec * sin_ra, sin_dec];
            let ra_hat = [-sin_ra, cos_ra, 0.0];
            let dec_hat = [-sin_dec * cos_ra, -sin_dec * sin_ra, cos_dec];
            let d = self.distance[i];
            let v_ra = d * self.pm_ra_cosdec[i] * KMS_PER_KPC_MAS_YR;
            let v_dec = d * self.pm_dec[i] * KMS_PER_KPC_MAS_YR;
            let rv = self.radial_velocity[i];
            for k in 0..3 {
                pos[[i, k]] = d * r_hat[k];
                vel[[i, k]] = rv * r_hat[k] + v_ra * ra_hat[k] + v_dec * dec_hat[k];
            }
        }
        (pos, vel)
    }
}

/// Galactocentric Cartesian phase-space positions: kpc and km/s, one row per star
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseSpace {
    pub pos: Array2<f64>,
    pub vel: Array2<f64>,
}

impl PhaseSpace {
    pub fn new(pos: Array2<f64>, vel: Array2<f64>) -> Result<Self, TableError> {
        for (name, a) in [("pos", &pos), ("vel", &vel)] {
            if a.ncols() != 3 {
                return Err(TableError::LengthMismatch {
                    name: format!("{name} components"),
                    actual: a.ncols(),
                    expected: 3,
                });
            }
        }
        if pos.nrows() != vel.nrows() {
            return Err(TableError::LengthMismatch {
                name: "vel".to_owned(),
                actual: vel.nrows(),
                expected: pos.nrows(),
            });
        }
        Ok(Self { pos, vel })
    }

    pub fn len(&self) -> usize {
        self.pos.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.pos.view()
    }

    pub fn v(&self) -> ArrayView2<'_, f64> {
        self.vel.view()
    }

    /// Cylindrical radius in the Galactic plane, kpc
    pub fn cylindrical_radius(&self) -> Array1<f64> {
        self.pos.map_axis(Axis(1), |x| x[0].hypot(x[1]))
    }
}
