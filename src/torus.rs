//! Abundance variation around orbital tori

use crate::data::{AafTable, Dataset};
use crate::error::{CollaboratorError, TableError};

use ndarray::{Array1, Array2, ArrayView1};

/// Abundance of one element and its measurement uncertainty, per star
#[derive(Clone, Debug, PartialEq)]
pub struct AbundanceColumn {
    pub name: String,
    pub values: Array1<f64>,
    pub errors: Array1<f64>,
}

impl AbundanceColumn {
    /// Suffix of the uncertainty column name
    pub const ERROR_SUFFIX: &'static str = "_ERR";

    /// Select `<elem_name>` and `<elem_name>_ERR` columns of the dataset
    pub fn from_dataset(dataset: &Dataset, elem_name: &str) -> Result<Self, TableError> {
        let values = dataset.column(elem_name)?.to_owned();
        let errors = dataset
            .column(&format!("{elem_name}{}", Self::ERROR_SUFFIX))?
            .to_owned();
        Ok(Self {
            name: elem_name.to_owned(),
            values,
            errors,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// AAF table joined row-by-row with an abundance column
#[derive(Clone, Copy, Debug)]
pub struct AbundanceTorusTable<'a> {
    pub aaf: &'a AafTable,
    pub abundance: &'a AbundanceColumn,
}

impl<'a> AbundanceTorusTable<'a> {
    pub fn join(aaf: &'a AafTable, abundance: &'a AbundanceColumn) -> Result<Self, TableError> {
        if aaf.len() != abundance.len() {
            return Err(TableError::LengthMismatch {
                name: abundance.name.clone(),
                actual: abundance.len(),
                expected: aaf.len(),
            });
        }
        Ok(Self { aaf, abundance })
    }

    pub fn len(&self) -> usize {
        self.aaf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aaf.is_empty()
    }

    pub fn values(&self) -> ArrayView1<'a, f64> {
        self.abundance.values.view()
    }

    pub fn errors(&self) -> ArrayView1<'a, f64> {
        self.abundance.errors.view()
    }
}

/// Coefficients of the abundance model around the torus
///
/// `constant` is the mean abundance level, `harmonics` are the three angle-dependent terms in the
/// order the fitter reports them. A potential that maps stars onto their true tori leaves no
/// systematic abundance variation with angle, so all harmonics vanish.
#[derive(Clone, Debug, PartialEq)]
pub struct TorusCoefficients {
    pub constant: f64,
    pub harmonics: [f64; 3],
    pub covariance: Array2<f64>,
}

impl TorusCoefficients {
    /// Sum of squared harmonic amplitudes
    pub fn residual(&self) -> f64 {
        self.harmonics.iter().map(|c| c * c).sum()
    }
}

/// Nearest-neighbour fitter of abundance versus orbital angle
///
/// `tree_k` is the number of neighbours in action space used to estimate the local mean
/// abundance.
pub trait TorusFitter {
    fn coefficients(
        &self,
        table: &AbundanceTorusTable<'_>,
        elem_name: &str,
        tree_k: usize,
    ) -> Result<TorusCoefficients, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    #[test]
    fn residual_ignores_constant() {
        let c = TorusCoefficients {
            constant: 10.0,
            harmonics: [1.0, -2.0, 0.5],
            covariance: Array2::eye(4),
        };
        assert_eq!(c.residual(), 5.25);
    }

    #[test]
    fn join_checks_rows() {
        let aaf = AafTable::new(
            Array2::zeros((2, 3)),
            Array2::zeros((2, 3)),
            Array2::zeros((2, 3)),
        )
        .unwrap();
        let abundance = AbundanceColumn {
            name: "MG_FE".to_owned(),
            values: array![0.1, 0.2, 0.3],
            errors: array![0.01, 0.01, 0.01],
        };
        assert!(AbundanceTorusTable::join(&aaf, &abundance).is_err());
    }
}
