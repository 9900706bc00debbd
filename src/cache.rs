use crate::interp::FileGridStore;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// On-disk layout of the action cache
///
/// ```text
/// <root>/potential-mhalo-interp.pkl
/// <root>/<dataset>/aaf-<potential>.fits
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheLayout {
    pub root: PathBuf,
}

impl CacheLayout {
    pub const HALO_GRID_FILENAME: &'static str = "potential-mhalo-interp.pkl";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dataset_dir(&self, dataset: &str) -> PathBuf {
        self.root.join(dataset)
    }

    pub fn aaf_path(&self, dataset: &str, potential: &str) -> PathBuf {
        self.dataset_dir(dataset)
            .join(format!("aaf-{potential}.fits"))
    }

    pub fn halo_grid_path(&self) -> PathBuf {
        self.root.join(Self::HALO_GRID_FILENAME)
    }

    pub fn halo_grid_store(&self) -> FileGridStore {
        FileGridStore::new(self.halo_grid_path())
    }
}

fn destination_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Write a file so that readers see either the previous content or the complete new one
///
/// Data goes to a temporary file in the destination directory, which replaces `path` only after
/// `write` succeeded. The destination directory is created if needed.
pub fn write_atomically<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = destination_dir(path);
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// [write_atomically] for writers which create the file themselves
///
/// `write` gets a path in a staging directory next to `path` where no file exists yet.
pub fn write_file_atomically<F, E>(path: &Path, write: F) -> Result<(), E>
where
    F: FnOnce(&Path) -> Result<(), E>,
    E: From<io::Error>,
{
    let dir = destination_dir(path);
    fs::create_dir_all(dir)?;
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a file path", path.display()),
        )
    })?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(dir)?;
    let staged = staging.path().join(file_name);
    write(&staged)?;
    fs::rename(&staged, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = CacheLayout::new("/tmp/cache");
        assert_eq!(
            layout.aaf_path("apogee-rgb", "mw-fiducial"),
            PathBuf::from("/tmp/cache/apogee-rgb/aaf-mw-fiducial.fits")
        );
        assert_eq!(
            layout.halo_grid_path(),
            PathBuf::from("/tmp/cache/potential-mhalo-interp.pkl")
        );
        assert_eq!(layout.halo_grid_store().path(), layout.halo_grid_path());
    }

    #[test]
    fn atomic_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b.txt");
        write_atomically(&path, |w| w.write_all(b"hello")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        fs::write(&path, "previous").unwrap();

        let result = write_atomically(&path, |w| {
            w.write_all(b"partial")?;
            Err(io::Error::other("solver exploded"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn staged_file_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("aaf-mw.fits");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "previous").unwrap();

        write_file_atomically(&path, |staged: &Path| {
            assert!(!staged.exists());
            assert_ne!(staged, path);
            fs::write(staged, "new")
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn failed_staged_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aaf-mw.fits");
        fs::write(&path, "previous").unwrap();

        let result = write_file_atomically(&path, |staged: &Path| {
            fs::write(staged, "partial")?;
            Err(io::Error::other("solver exploded"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
