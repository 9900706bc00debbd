use crate::data::observations::SkyObservations;
use crate::error::TableError;
use crate::registry::Registry;

use ndarray::{Array1, ArrayView1};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column of per-star identifiers, propagated into every derived table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdColumn {
    pub name: String,
    pub values: Vec<String>,
}

impl IdColumn {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Named survey sample: astrometry, star identifiers and abundance measurements
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    name: String,
    observations: SkyObservations,
    ids: IdColumn,
    columns: BTreeMap<String, Array1<f64>>,
}

impl Dataset {
    const ASTROMETRY: [&'static str; 6] = [
        "ra",
        "dec",
        "distance",
        "pm_ra_cosdec",
        "pm_dec",
        "radial_velocity",
    ];

    pub fn new(
        name: impl Into<String>,
        observations: SkyObservations,
        ids: IdColumn,
        columns: BTreeMap<String, Array1<f64>>,
    ) -> Result<Self, TableError> {
        let expected = observations.len();
        let lengths = std::iter::once((ids.name.as_str(), ids.len()))
            .chain(columns.iter().map(|(name, c)| (name.as_str(), c.len())));
        for (name, actual) in lengths {
            if actual != expected {
                return Err(TableError::LengthMismatch {
                    name: name.to_owned(),
                    actual,
                    expected,
                });
            }
        }
        Ok(Self {
            name: name.into(),
            observations,
            ids,
            columns,
        })
    }

    /// Read a dataset from CSV with a header row
    ///
    /// Columns `ra`, `dec`, `distance`, `pm_ra_cosdec`, `pm_dec`, `radial_velocity` and
    /// `id_column` are required. Every other column is read as a numeric measurement, empty cells
    /// become NaN.
    pub fn from_csv_reader<R: Read>(
        name: impl Into<String>,
        reader: R,
        id_column: &str,
    ) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| TableError::MissingColumn(column.to_owned()))
        };
        let id_index = position(id_column)?;
        let astrometry_indices: Vec<usize> = Self::ASTROMETRY
            .iter()
            .map(|&column| position(column))
            .collect::<Result<_, _>>()?;
        let numeric_indices: Vec<usize> = (0..headers.len())
            .filter(|&i| i != id_index && !astrometry_indices.contains(&i))
            .collect();

        let mut ids = vec![];
        let mut astrometry: [Vec<f64>; 6] = Default::default();
        let mut numeric = vec![vec![]; numeric_indices.len()];
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            let parse = |i: usize| -> Result<f64, TableError> {
                let value = record.get(i).unwrap_or_default();
                if value.is_empty() {
                    return Ok(f64::NAN);
                }
                value.parse().map_err(|_| TableError::InvalidValue {
                    column: headers[i].to_owned(),
                    row,
                    value: value.to_owned(),
                })
            };
            ids.push(record.get(id_index).unwrap_or_default().to_owned());
            for (column, &i) in astrometry.iter_mut().zip(&astrometry_indices) {
                column.push(parse(i)?);
            }
            for (column, &i) in numeric.iter_mut().zip(&numeric_indices) {
                column.push(parse(i)?);
            }
        }

        let [ra, dec, distance, pm_ra_cosdec, pm_dec, radial_velocity] = astrometry;
        let observations =
            SkyObservations::new(ra, dec, distance, pm_ra_cosdec, pm_dec, radial_velocity)?;
        let columns = numeric_indices
            .iter()
            .zip(numeric)
            .map(|(&i, values)| (headers[i].to_owned(), Array1::from_vec(values)))
            .collect();
        Self::new(name, observations, IdColumn::new(id_column, ids), columns)
    }

    pub fn from_csv_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        id_column: &str,
    ) -> Result<Self, TableError> {
        let file = File::open(path)?;
        Self::from_csv_reader(name, file, id_column)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn observations(&self) -> &SkyObservations {
        &self.observations
    }

    pub fn ids(&self) -> &IdColumn {
        &self.ids
    }

    pub fn id_column_name(&self) -> &str {
        &self.ids.name
    }

    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>, TableError> {
        self.columns
            .get(name)
            .map(Array1::view)
            .ok_or_else(|| TableError::MissingColumn(name.to_owned()))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

pub type DatasetRegistry = Registry<Dataset>;

impl Registry<Dataset> {
    pub fn from_datasets(datasets: impl IntoIterator<Item = Dataset>) -> Self {
        datasets
            .into_iter()
            .fold(Self::new("dataset"), |registry, d| {
                let name = d.name.clone();
                registry.with(name, d)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use torus_imaging_test_util::{ABUNDANCE_COLUMN, MINI_CATALOGUE};

    const CSV: &str = "\
APOGEE_ID,ra,dec,distance,pm_ra_cosdec,pm_dec,radial_velocity,MG_FE,MG_FE_ERR
2M0001,10.0,-5.0,1.2,3.0,-2.0,15.0,0.12,0.02
2M0002,200.5,30.25,0.8,-1.5,4.0,-40.0,,0.03
";

    #[test]
    fn read_csv() {
        let d = Dataset::from_csv_reader("mini", CSV.as_bytes(), "APOGEE_ID").unwrap();
        assert_eq!(d.name(), "mini");
        assert_eq!(d.len(), 2);
        assert_eq!(d.id_column_name(), "APOGEE_ID");
        assert_eq!(d.ids().values, ["2M0001", "2M0002"]);
        assert_eq!(d.observations().dec[1], 30.25);
        assert_eq!(d.column_names().collect::<Vec<_>>(), ["MG_FE", "MG_FE_ERR"]);
        let mg = d.column("MG_FE").unwrap();
        assert_eq!(mg[0], 0.12);
        assert!(mg[1].is_nan());
    }

    #[test]
    fn missing_astrometry_column() {
        let csv = "APOGEE_ID,ra,dec\n2M0001,1.0,2.0\n";
        let err = Dataset::from_csv_reader("bad", csv.as_bytes(), "APOGEE_ID").unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(ref c) if c == "distance"));
    }

    #[test]
    fn invalid_number() {
        let csv = CSV.replace("0.12", "lots");
        let err = Dataset::from_csv_reader("bad", csv.as_bytes(), "APOGEE_ID").unwrap_err();
        assert!(matches!(
            err,
            TableError::InvalidValue { ref column, row: 0, .. } if column == "MG_FE"
        ));
    }

    #[test]
    fn fixture_catalogue() {
        let d = crate::tests::mini_dataset();
        assert_eq!(d.len(), MINI_CATALOGUE.len());
        for (i, star) in MINI_CATALOGUE.iter().enumerate() {
            assert_eq!(d.ids().values[i], star.apogee_id);
            assert_eq!(d.observations().radial_velocity[i], star.radial_velocity);
            assert_eq!(d.column(ABUNDANCE_COLUMN).unwrap()[i], star.mg_fe);
        }
    }

    #[test]
    fn registry_by_name() {
        let d = Dataset::from_csv_reader("mini", CSV.as_bytes(), "APOGEE_ID").unwrap();
        let registry = DatasetRegistry::from_datasets([d]);
        assert_eq!(registry.get("mini").unwrap().len(), 2);
        assert!(registry.get("apogee").is_err());
    }
}
