use crate::error::InterpolationError;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

// Underlying values are guaranteed to be finite and strictly increasing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct SortedArray(Vec<f64>);

impl SortedArray {
    pub fn from_sorted(sorted: impl Into<Vec<f64>>) -> Result<Self, InterpolationError> {
        let sorted = sorted.into();
        if sorted.iter().any(|x| !x.is_finite()) {
            return Err(InterpolationError::NonFinite);
        }
        if sorted.windows(2).all(|w| w[0] < w[1]) {
            Ok(Self(sorted))
        } else {
            Err(InterpolationError::Unsorted)
        }
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(&self.0[..])
    }
}

impl TryFrom<Vec<f64>> for SortedArray {
    type Error = InterpolationError;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_sorted(v)
    }
}

impl From<SortedArray> for Vec<f64> {
    fn from(a: SortedArray) -> Self {
        a.0
    }
}

impl Deref for SortedArray {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[f64]> for SortedArray {
    fn as_ref(&self) -> &[f64] {
        self
    }
}
