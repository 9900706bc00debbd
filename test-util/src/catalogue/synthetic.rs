use crate::catalogue::record::StarRecord;
use crate::catalogue::{Error, records_to_csv};

use rand::prelude::*;
use rand_distr::{Normal, Uniform};

/// Seeded generator of solar-neighbourhood stars
///
/// Sky positions are isotropic, distances uniform, kinematics and abundances Gaussian.
#[derive(Clone, Debug)]
pub struct SyntheticCatalogue {
    pub size: usize,
    pub seed: u64,
    pub max_distance: f64,
    pub velocity_dispersion: f64,
    pub mean_abundance: f64,
    pub abundance_scatter: f64,
}

impl SyntheticCatalogue {
    pub fn new(size: usize, seed: u64) -> Self {
        Self {
            size,
            seed,
            max_distance: 3.0,
            velocity_dispersion: 35.0,
            mean_abundance: 0.1,
            abundance_scatter: 0.05,
        }
    }

    pub fn records(&self) -> Vec<StarRecord> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let ra = Uniform::new(0.0, 360.0).unwrap();
        let sin_dec = Uniform::new_inclusive(-1.0_f64, 1.0).unwrap();
        let distance = Uniform::new(0.1, self.max_distance).unwrap();
        // 4.74 km/s per kpc mas/yr converts the velocity dispersion at 1 kpc
        let proper_motion = Normal::new(0.0, self.velocity_dispersion / 4.74).unwrap();
        let radial_velocity = Normal::new(0.0, self.velocity_dispersion).unwrap();
        let abundance = Normal::new(self.mean_abundance, self.abundance_scatter).unwrap();
        let abundance_err = Uniform::new(0.01, 0.03).unwrap();

        (0..self.size)
            .map(|i| StarRecord {
                apogee_id: format!("2M{:08}+{:07}", i, self.seed % 10_000_000),
                ra: ra.sample(&mut rng),
                dec: sin_dec.sample(&mut rng).asin().to_degrees(),
                distance: distance.sample(&mut rng),
                pm_ra_cosdec: proper_motion.sample(&mut rng),
                pm_dec: proper_motion.sample(&mut rng),
                radial_velocity: radial_velocity.sample(&mut rng),
                mg_fe: abundance.sample(&mut rng),
                mg_fe_err: abundance_err.sample(&mut rng),
            })
            .collect()
    }

    pub fn to_csv(&self) -> Result<String, Error> {
        records_to_csv(&self.records())
    }
}

pub fn synthetic_catalogue(size: usize, seed: u64) -> Vec<StarRecord> {
    SyntheticCatalogue::new(size, seed).records()
}
