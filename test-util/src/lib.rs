pub use catalogue::mini::{MINI_CATALOGUE, MINI_CATALOGUE_CSV};
pub use catalogue::record::{ABUNDANCE_COLUMN, ID_COLUMN, StarRecord};
pub use catalogue::synthetic::{SyntheticCatalogue, synthetic_catalogue};
pub use catalogue::{Error, records_from_reader, records_to_csv};

mod catalogue;
