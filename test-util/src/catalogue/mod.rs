use record::StarRecord;

use itertools::process_results;
use std::io::Read;

pub(crate) mod mini;
pub(crate) mod record;
pub(crate) mod synthetic;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// We cannot return `Dataset`, because it would cause cyclic crate dependencies
pub fn records_from_reader<R: Read>(reader: R) -> Result<Vec<StarRecord>, Error> {
    let mut csv_reader = csv::ReaderBuilder::new().from_reader(reader);
    let records: Vec<StarRecord> = process_results(csv_reader.deserialize(), |iter| iter.collect())?;
    Ok(records)
}

pub fn records_to_csv(records: &[StarRecord]) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(vec![]);
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
