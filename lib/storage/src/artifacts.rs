// Persisted index artifacts: catalog table, embedding matrix, index, manifest
use carbonmatch_core::{CatalogRecord, Error, Result, SimilarityIndex, Vector};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::write_atomic;

/// On-disk layout version
pub const FORMAT_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CATALOG_FILE: &str = "catalog.json.gz";
pub const EMBEDDINGS_FILE: &str = "embeddings.bin";
pub const INDEX_FILE: &str = "index.bin";

/// Describes one saved index. Written last, so its presence means every
/// artifact it lists is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub rows: usize,
    pub dim: usize,
    /// Name of the embedding provider that produced the vectors
    pub provider: String,
    pub created_at: DateTime<Utc>,
    /// Text cleaning settings the catalog was built with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<serde_json::Value>,
    /// File name -> hex SHA-256
    pub checksums: BTreeMap<String, String>,
}

impl Manifest {
    /// Check that vectors in this index came from a provider like `name`/`dim`
    pub fn ensure_provider(&self, name: &str, dim: usize) -> Result<()> {
        if self.dim != dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: dim,
            });
        }
        if self.provider != name {
            return Err(Error::IndexUnavailable(format!(
                "index was built with provider '{}', not '{}'",
                self.provider, name
            )));
        }
        Ok(())
    }

    /// Decode the recorded normalizer settings, if any
    pub fn normalizer_config<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.normalizer {
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|e| unavailable(MANIFEST_FILE, e)),
            None => Ok(None),
        }
    }
}

/// Columnar catalog table
#[derive(Debug, Serialize, Deserialize)]
struct CatalogTable {
    names: Vec<String>,
    cleaned: Vec<String>,
    carbon_ratings: Vec<String>,
}

/// Raw row-major embedding matrix
#[derive(Debug, Serialize, Deserialize)]
struct EmbeddingMatrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

/// Row-major matrix of unit vectors
#[derive(Debug, Serialize, Deserialize)]
struct IndexMatrix {
    dim: usize,
    data: Vec<f32>,
}

/// Everything needed to assemble a matcher
#[derive(Debug)]
pub struct IndexArtifacts {
    pub manifest: Manifest,
    pub catalog: Vec<CatalogRecord>,
    pub index: SimilarityIndex,
}

/// Reads and writes the artifacts of one index directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    write_index: bool,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            write_index: true,
        }
    }

    /// Skip `index.bin` on save; loaders then rebuild it from the embeddings
    pub fn without_index_file(mut self) -> Self {
        self.write_index = false;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a manifest is present
    pub fn exists(&self) -> bool {
        self.dir.join(MANIFEST_FILE).is_file()
    }

    /// Persist `catalog` and `index`, recording `normalizer` settings in
    /// the manifest.
    ///
    /// Any previous manifest is removed first, so an interrupted save
    /// leaves a directory that fails to load instead of a mixed one.
    pub fn save<N>(
        &self,
        catalog: &[CatalogRecord],
        index: &SimilarityIndex,
        provider: &str,
        normalizer: &N,
    ) -> Result<Manifest>
    where
        N: Serialize + ?Sized,
    {
        if catalog.is_empty() {
            return Err(Error::InvalidConfig("refusing to save an empty catalog".to_string()));
        }
        if index.len() != catalog.len() {
            return Err(Error::InvalidConfig(format!(
                "index has {} rows but catalog has {}",
                index.len(),
                catalog.len()
            )));
        }
        let dim = index.dim();
        if let Some(record) = catalog.iter().find(|r| r.embedding.dim() != dim) {
            return Err(Error::DimensionMismatch {
                expected: dim,
                actual: record.embedding.dim(),
            });
        }

        fs::create_dir_all(&self.dir)?;
        match fs::remove_file(self.dir.join(MANIFEST_FILE)) {
            Ok(()) => debug!(dir = %self.dir.display(), "replacing existing index"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let normalizer =
            serde_json::to_value(normalizer).map_err(|e| Error::Serialization(e.to_string()))?;
        let mut checksums = BTreeMap::new();

        let table = CatalogTable {
            names: catalog.iter().map(|r| r.name.clone()).collect(),
            cleaned: catalog.iter().map(|r| r.cleaned.clone()).collect(),
            carbon_ratings: catalog.iter().map(|r| r.carbon_rating.clone()).collect(),
        };
        let json = serde_json::to_vec(&table).map_err(|e| Error::Serialization(e.to_string()))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        self.write_artifact(CATALOG_FILE, &encoder.finish()?, &mut checksums)?;

        let matrix = EmbeddingMatrix {
            rows: catalog.len(),
            dim,
            data: catalog
                .iter()
                .flat_map(|r| r.embedding.as_slice().iter().copied())
                .collect(),
        };
        self.write_artifact(EMBEDDINGS_FILE, &encode_bincode(&matrix)?, &mut checksums)?;

        if self.write_index {
            let normalized = IndexMatrix {
                dim,
                data: index.as_matrix().to_vec(),
            };
            self.write_artifact(INDEX_FILE, &encode_bincode(&normalized)?, &mut checksums)?;
        }

        let manifest = Manifest {
            version: FORMAT_VERSION,
            rows: catalog.len(),
            dim,
            provider: provider.to_string(),
            created_at: Utc::now(),
            normalizer: Some(normalizer),
            checksums,
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        write_atomic(&self.dir.join(MANIFEST_FILE), &json)?;

        info!(
            dir = %self.dir.display(),
            rows = manifest.rows,
            dim,
            provider,
            "index saved"
        );
        Ok(manifest)
    }

    /// Read the manifest only
    pub fn manifest(&self) -> Result<Manifest> {
        let bytes = self.read_required(MANIFEST_FILE)?;
        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|e| unavailable(MANIFEST_FILE, e))?;
        if manifest.version != FORMAT_VERSION {
            return Err(Error::IndexUnavailable(format!(
                "unsupported index format version {} (expected {})",
                manifest.version, FORMAT_VERSION
            )));
        }
        Ok(manifest)
    }

    /// Load and cross-check every artifact
    pub fn load(&self) -> Result<IndexArtifacts> {
        let manifest = self.manifest()?;

        let bytes = self.read_verified(CATALOG_FILE, &manifest)?;
        let mut json = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut json)
            .map_err(|e| unavailable(CATALOG_FILE, e))?;
        let table: CatalogTable =
            serde_json::from_slice(&json).map_err(|e| unavailable(CATALOG_FILE, e))?;
        if table.names.len() != manifest.rows
            || table.cleaned.len() != manifest.rows
            || table.carbon_ratings.len() != manifest.rows
        {
            return Err(Error::IndexUnavailable(format!(
                "{} columns disagree with the manifest's {} rows",
                CATALOG_FILE, manifest.rows
            )));
        }

        let bytes = self.read_verified(EMBEDDINGS_FILE, &manifest)?;
        let matrix: EmbeddingMatrix =
            bincode::deserialize(&bytes).map_err(|e| unavailable(EMBEDDINGS_FILE, e))?;
        if matrix.rows != manifest.rows
            || matrix.dim != manifest.dim
            || matrix.dim == 0
            || matrix.data.len() != matrix.rows * matrix.dim
        {
            return Err(Error::IndexUnavailable(format!(
                "{} is {}x{} with {} values, manifest says {}x{}",
                EMBEDDINGS_FILE,
                matrix.rows,
                matrix.dim,
                matrix.data.len(),
                manifest.rows,
                manifest.dim
            )));
        }

        let catalog: Vec<CatalogRecord> = table
            .names
            .into_iter()
            .zip(table.cleaned)
            .zip(table.carbon_ratings)
            .zip(matrix.data.chunks_exact(matrix.dim))
            .map(|(((name, cleaned), rating), row)| {
                CatalogRecord::new(name, cleaned, Vector::from_slice(row), rating)
            })
            .collect();

        let index = match self.load_index(&manifest)? {
            Some(index) => index,
            None => SimilarityIndex::build(catalog.iter().map(|r| &r.embedding))
                .map_err(|e| Error::IndexUnavailable(format!("rebuilding index: {}", e)))?,
        };
        if index.len() != manifest.rows || index.dim() != manifest.dim {
            return Err(Error::IndexUnavailable(format!(
                "{} is {}x{}, manifest says {}x{}",
                INDEX_FILE,
                index.len(),
                index.dim(),
                manifest.rows,
                manifest.dim
            )));
        }

        info!(
            dir = %self.dir.display(),
            rows = manifest.rows,
            dim = manifest.dim,
            provider = %manifest.provider,
            "index loaded"
        );
        Ok(IndexArtifacts {
            manifest,
            catalog,
            index,
        })
    }

    fn load_index(&self, manifest: &Manifest) -> Result<Option<SimilarityIndex>> {
        if !manifest.checksums.contains_key(INDEX_FILE) {
            return Ok(None);
        }
        if !self.dir.join(INDEX_FILE).is_file() {
            warn!(dir = %self.dir.display(), "{} missing, rebuilding from embeddings", INDEX_FILE);
            return Ok(None);
        }
        let bytes = self.read_verified(INDEX_FILE, manifest)?;
        let matrix: IndexMatrix =
            bincode::deserialize(&bytes).map_err(|e| unavailable(INDEX_FILE, e))?;
        SimilarityIndex::from_normalized(matrix.dim, matrix.data)
            .map(Some)
            .map_err(|e| unavailable(INDEX_FILE, e))
    }

    fn write_artifact(
        &self,
        file: &str,
        bytes: &[u8],
        checksums: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        write_atomic(&self.dir.join(file), bytes)?;
        checksums.insert(file.to_string(), sha256_hex(bytes));
        debug!(file, bytes = bytes.len(), "artifact written");
        Ok(())
    }

    fn read_required(&self, file: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(file);
        fs::read(&path).map_err(|e| {
            Error::IndexUnavailable(format!("cannot read {}: {}", path.display(), e))
        })
    }

    fn read_verified(&self, file: &str, manifest: &Manifest) -> Result<Vec<u8>> {
        let expected = manifest.checksums.get(file).ok_or_else(|| {
            Error::IndexUnavailable(format!("manifest has no checksum for {}", file))
        })?;
        let bytes = self.read_required(file)?;
        if &sha256_hex(&bytes) != expected {
            return Err(Error::IndexUnavailable(format!("checksum mismatch for {}", file)));
        }
        Ok(bytes)
    }
}

fn encode_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn unavailable(file: &str, e: impl std::fmt::Display) -> Error {
    Error::IndexUnavailable(format!("cannot decode {}: {}", file, e))
}
