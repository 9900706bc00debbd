use crate::cache::write_file_atomically;
use crate::data::dataset::IdColumn;
use crate::error::TableError;

use fitsio::FitsFile;
use fitsio::hdu::HduInfo;
use fitsio::tables::{ColumnDataType, ColumnDescription};
use ndarray::{Array2, ArrayView1, Axis};
use std::path::Path;

/// Actions, angles and frequencies of a set of orbits
///
/// Every array has shape `(n, 3)` with columns for the radial, azimuthal and vertical degrees of
/// freedom. Actions are in kpc·km/s, angles in radians, frequencies in km/s/kpc.
#[derive(Clone, Debug, PartialEq)]
pub struct AafTable {
    pub actions: Array2<f64>,
    pub angles: Array2<f64>,
    pub freqs: Array2<f64>,
    ids: Option<IdColumn>,
}

impl AafTable {
    /// Name of the FITS table extension
    pub const EXTNAME: &'static str = "AAF";

    pub const COLUMNS: [&'static str; 9] = [
        "J_R",
        "J_phi",
        "J_z",
        "theta_R",
        "theta_phi",
        "theta_z",
        "Omega_R",
        "Omega_phi",
        "Omega_z",
    ];

    pub fn new(
        actions: Array2<f64>,
        angles: Array2<f64>,
        freqs: Array2<f64>,
    ) -> Result<Self, TableError> {
        let expected = actions.nrows();
        for (name, a) in [("actions", &actions), ("angles", &angles), ("freqs", &freqs)] {
            if a.ncols() != 3 {
                return Err(TableError::LengthMismatch {
                    name: format!("{name} components"),
                    actual: a.ncols(),
                    expected: 3,
                });
            }
            if a.nrows() != expected {
                return Err(TableError::LengthMismatch {
                    name: name.to_owned(),
                    actual: a.nrows(),
                    expected,
                });
            }
        }
        Ok(Self {
            actions,
            angles,
            freqs,
            ids: None,
        })
    }

    pub fn len(&self) -> usize {
        self.actions.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Option<&IdColumn> {
        self.ids.as_ref()
    }

    /// Attach a row identifier column, replacing the previous one
    pub fn with_ids(mut self, ids: IdColumn) -> Result<Self, TableError> {
        if ids.len() != self.len() {
            return Err(TableError::LengthMismatch {
                actual: ids.len(),
                expected: self.len(),
                name: ids.name,
            });
        }
        self.ids = Some(ids);
        Ok(self)
    }

    pub fn angle(&self, component: usize) -> ArrayView1<'_, f64> {
        self.angles.index_axis(Axis(1), component)
    }

    /// Column `i` of [AafTable::COLUMNS]
    pub fn column(&self, i: usize) -> ArrayView1<'_, f64> {
        let block = match i / 3 {
            0 => &self.actions,
            1 => &self.angles,
            _ => &self.freqs,
        };
        block.index_axis(Axis(1), i % 3)
    }

    /// Write a binary-table FITS file with the nine float columns followed by the id column
    ///
    /// `path` must not exist.
    pub fn write_fits(&self, path: &Path) -> Result<(), TableError> {
        let mut fits = FitsFile::create(path).open()?;
        let mut descriptions = Self::COLUMNS
            .iter()
            .map(|&name| {
                ColumnDescription::new(name)
                    .with_type(ColumnDataType::Double)
                    .create()
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(ids) = &self.ids {
            let width = ids.values.iter().map(String::len).max().unwrap_or(0).max(1);
            descriptions.push(
                ColumnDescription::new(ids.name.as_str())
                    .with_type(ColumnDataType::String)
                    .that_repeats(width)
                    .create()?,
            );
        }
        let hdu = fits.create_table(Self::EXTNAME, &descriptions)?;
        for (i, &name) in Self::COLUMNS.iter().enumerate() {
            hdu.write_col(&mut fits, name, &self.column(i).to_vec())?;
        }
        if let Some(ids) = &self.ids {
            hdu.write_col(&mut fits, ids.name.as_str(), &ids.values)?;
        }
        Ok(())
    }

    /// Replace `path` with this table, readers never observe a partially written file
    pub fn write_fits_atomically(&self, path: &Path) -> Result<(), TableError> {
        write_file_atomically(path, |staged| self.write_fits(staged))
    }

    /// Read a table written by [AafTable::write_fits]
    ///
    /// A tenth column, if present, is the id column.
    pub fn read_fits(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let mut fits = FitsFile::open(path.as_ref())?;
        let hdu = fits.hdu(Self::EXTNAME)?;
        let names: Vec<String> = match &hdu.info {
            HduInfo::TableInfo {
                column_descriptions,
                ..
            } => column_descriptions.iter().map(|c| c.name.clone()).collect(),
            _ => vec![],
        };
        for (i, &column) in Self::COLUMNS.iter().enumerate() {
            if names.get(i).map(String::as_str) != Some(column) {
                return Err(TableError::MissingColumn(column.to_owned()));
            }
        }

        let columns = Self::COLUMNS
            .iter()
            .map(|&name| hdu.read_col::<f64>(&mut fits, name))
            .collect::<Result<Vec<_>, _>>()?;
        let n = columns[0].len();
        if let Some((name, column)) = Self::COLUMNS
            .iter()
            .zip(&columns)
            .find(|(_, column)| column.len() != n)
        {
            return Err(TableError::LengthMismatch {
                name: (*name).to_owned(),
                actual: column.len(),
                expected: n,
            });
        }
        let block = |offset: usize| Array2::from_shape_fn((n, 3), |(row, k)| columns[offset + k][row]);
        let table = Self::new(block(0), block(3), block(6))?;

        match names.get(Self::COLUMNS.len()) {
            Some(id_name) => {
                let ids: Vec<String> = hdu.read_col(&mut fits, id_name.as_str())?;
                let ids = ids.into_iter().map(|id| id.trim_end().to_owned()).collect();
                table.with_ids(IdColumn::new(id_name.clone(), ids))
            }
            None => Ok(table),
        }
    }
}
