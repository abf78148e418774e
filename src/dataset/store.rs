//! In-memory dataset store
//!
//! Holds every added dataset in insertion order. The store itself is not
//! synchronized: shared callers wrap it in `Arc<tokio::sync::RwLock<_>>` so
//! queries read concurrently while add/remove take the lock exclusively.

use crate::dataset::error::{DatasetError, DatasetResult};
use crate::dataset::record::{Record, Room, Section};
use crate::dataset::schema::{Kind, SchemaRegistry, SEPARATOR};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A named, immutable collection of records of a single kind
#[derive(Debug, Clone)]
pub struct Dataset {
    id: String,
    kind: Kind,
    records: Vec<Record>,
}

impl Dataset {
    /// Create a dataset, checking the id and that every record fits the kind
    pub fn new(id: impl Into<String>, kind: Kind, records: Vec<Record>) -> DatasetResult<Self> {
        let id = id.into();
        validate_id(&id)?;

        for (index, record) in records.iter().enumerate() {
            if record.kind() != kind {
                return Err(DatasetError::KindMismatch { id, index, kind });
            }
            if !record.has_finite_numbers() {
                return Err(DatasetError::InvalidRecord(format!(
                    "record {} in dataset {} has a non-finite numeric field",
                    index, id
                )));
            }
        }

        Ok(Self { id, kind, records })
    }

    /// Build a dataset from a JSON array of normalized records
    pub fn from_json(
        id: impl Into<String>,
        kind: Kind,
        records: serde_json::Value,
    ) -> DatasetResult<Self> {
        let records: Vec<Record> = match kind {
            Kind::Sections => serde_json::from_value::<Vec<Section>>(records)
                .map_err(|e| DatasetError::InvalidRecord(e.to_string()))?
                .into_iter()
                .map(Record::from)
                .collect(),
            Kind::Rooms => serde_json::from_value::<Vec<Room>>(records)
                .map_err(|e| DatasetError::InvalidRecord(e.to_string()))?
                .into_iter()
                .map(Record::from)
                .collect(),
        };

        Self::new(id, kind, records)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Summary for listings
    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            id: self.id.clone(),
            kind: self.kind,
            num_rows: self.records.len(),
        }
    }
}

/// Dataset summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub id: String,
    pub kind: Kind,
    pub num_rows: usize,
}

/// On-disk seed file format: `{ "id": ..., "kind": ..., "records": [...] }`
#[derive(Debug, Deserialize)]
pub struct DatasetFile {
    pub id: String,
    pub kind: Kind,
    pub records: serde_json::Value,
}

/// Read access to dataset records by id
pub trait DatasetSource {
    fn records_of(&self, dataset_id: &str) -> Option<&[Record]>;
}

/// Check a dataset id: non-empty, not whitespace-only, no separator
pub fn validate_id(id: &str) -> DatasetResult<()> {
    if id.trim().is_empty() || id.contains(SEPARATOR) {
        return Err(DatasetError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// All added datasets, keyed by id in insertion order
#[derive(Debug, Default)]
pub struct DatasetStore {
    datasets: IndexMap<String, Dataset>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dataset. Returns the ids of all datasets now present.
    pub fn add(&mut self, dataset: Dataset) -> DatasetResult<Vec<String>> {
        if self.datasets.contains_key(dataset.id()) {
            return Err(DatasetError::AlreadyExists(dataset.id().to_string()));
        }
        if dataset.is_empty() {
            return Err(DatasetError::Empty(dataset.id().to_string()));
        }

        tracing::info!(
            dataset_id = %dataset.id(),
            kind = %dataset.kind(),
            rows = dataset.len(),
            "Added dataset"
        );

        self.datasets.insert(dataset.id().to_string(), dataset);
        Ok(self.ids())
    }

    /// Remove a dataset by id, returning the id
    pub fn remove(&mut self, id: &str) -> DatasetResult<String> {
        validate_id(id)?;

        match self.datasets.shift_remove(id) {
            Some(dataset) => {
                tracing::info!(dataset_id = %id, "Removed dataset");
                Ok(dataset.id)
            }
            None => Err(DatasetError::NotFound(id.to_string())),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Dataset> {
        self.datasets.get(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    pub fn list(&self) -> Vec<DatasetInfo> {
        self.datasets.values().map(Dataset::info).collect()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Read a single seed file
    pub fn read_file(path: &Path) -> DatasetResult<Dataset> {
        let content = std::fs::read_to_string(path).map_err(|e| DatasetError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let file: DatasetFile = serde_json::from_str(&content).map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Dataset::from_json(file.id, file.kind, file.records)
    }

    /// Read every `*.json` seed file in a directory, sorted by file name
    pub fn read_dir(dir: &Path) -> DatasetResult<Vec<Dataset>> {
        let entries = std::fs::read_dir(dir).map_err(|e| DatasetError::Io {
            path: dir.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::read_file(p)).collect()
    }

    /// Add every seed file in a directory. Returns the number of datasets added.
    pub fn load_dir(&mut self, dir: &Path) -> DatasetResult<usize> {
        let datasets = Self::read_dir(dir)?;
        let count = datasets.len();

        for dataset in datasets {
            self.add(dataset)?;
        }

        tracing::info!("Loaded {} datasets from {:?}", count, dir);
        Ok(count)
    }
}

impl SchemaRegistry for DatasetStore {
    fn kind_of(&self, dataset_id: &str) -> Option<Kind> {
        self.datasets.get(dataset_id).map(Dataset::kind)
    }
}

impl DatasetSource for DatasetStore {
    fn records_of(&self, dataset_id: &str) -> Option<&[Record]> {
        self.datasets.get(dataset_id).map(Dataset::records)
    }
}
