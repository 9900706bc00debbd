mod aaf;
pub use aaf::AafTable;

mod dataset;
pub use dataset::{Dataset, DatasetRegistry, IdColumn};

mod observations;
pub use observations::{KMS_PER_KPC_MAS_YR, PhaseSpace, SkyObservations};
