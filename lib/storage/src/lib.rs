pub mod artifacts;
pub mod tabular;

pub use artifacts::{ArtifactStore, IndexArtifacts, Manifest, FORMAT_VERSION};
pub use tabular::{
    load_catalog_csv, load_product_names, load_results, read_catalog, read_column,
    read_results, save_results, write_results, CatalogColumns,
};

use atomicwrites::{AtomicFile, OverwriteBehavior};
use carbonmatch_core::{Error, Result};
use std::io::Write;
use std::path::Path;

/// Write `bytes` to a temporary file next to `path`, then rename it over `path`
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|file| file.write_all(bytes))
        .map_err(|e| match e {
            atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => Error::Io(e),
        })
}
