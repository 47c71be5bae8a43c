use std::{collections::BTreeMap, path::PathBuf};

use crate::{
    data_dir::DataDir,
    error::{Error, Result},
    ingestion,
    partition::{Hit, LanguageFilter, PartitionIndex},
    registry::Registry,
    walker,
};

/// Memory budget for each partition's index writer, in bytes.
pub const WRITER_BUDGET: usize = 15_000_000;

/// The collaborator interface to the full-text index.
///
/// One method per partition-scoped operation; the facade and the rebuild
/// orchestrator only ever talk to the index through this trait.
pub trait IndexBackend: Send + Sync {
    /// Names of all configured partitions, in stable order.
    fn partitions(&self) -> Vec<String>;

    /// Query one partition, returning up to `limit` score-ordered hits.
    fn query(
        &self,
        partition: &str,
        query: &str,
        languages: &LanguageFilter,
        limit: usize,
    ) -> Result<Vec<Hit>>;

    /// Schedule a full reindex of one partition from its source files.
    ///
    /// Returns the number of pages scheduled. Segment building and
    /// merging complete asynchronously on the index's own workers.
    fn schedule_reindex(&self, partition: &str) -> Result<usize>;
}

struct PartitionEntry {
    index: PartitionIndex,
    source_dir: PathBuf,
}

/// Production [`IndexBackend`] over one tantivy index per partition.
pub struct TantivyBackend {
    entries: BTreeMap<String, PartitionEntry>,
}

impl TantivyBackend {
    /// Open every partition registered in the registry, creating index
    /// directories under the data dir as needed.
    pub fn open(registry: &Registry, data_dir: &DataDir) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (name, source_dir) in registry.list_partitions()? {
            let index =
                PartitionIndex::open(&name, &data_dir.index_dir(&name)?)?;
            entries.insert(
                name,
                PartitionEntry {
                    index,
                    source_dir: PathBuf::from(source_dir),
                },
            );
        }
        Ok(Self { entries })
    }

    /// In-memory backend over the given (name, source_dir) pairs (for
    /// testing).
    pub fn open_in_ram<I>(partitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, PathBuf)>,
    {
        let mut entries = BTreeMap::new();
        for (name, source_dir) in partitions {
            let index = PartitionIndex::open_in_ram(&name)?;
            entries.insert(name, PartitionEntry { index, source_dir });
        }
        Ok(Self { entries })
    }

    /// Number of committed pages in one partition.
    pub fn doc_count(&self, partition: &str) -> Result<u64> {
        self.entry(partition)?.index.doc_count()
    }

    fn entry(&self, partition: &str) -> Result<&PartitionEntry> {
        self.entries.get(partition).ok_or_else(|| Error::NotFound {
            kind: "partition",
            name: partition.to_string(),
        })
    }
}

impl IndexBackend for TantivyBackend {
    fn partitions(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn query(
        &self,
        partition: &str,
        query: &str,
        languages: &LanguageFilter,
        limit: usize,
    ) -> Result<Vec<Hit>> {
        self.entry(partition)?.index.search(query, languages, limit)
    }

    fn schedule_reindex(&self, partition: &str) -> Result<usize> {
        let entry = self.entry(partition)?;
        let mut writer = entry.index.writer(WRITER_BUDGET)?;
        entry.index.clear(&mut writer)?;
        let pages = walker::discover_pages(&entry.source_dir)?;
        ingestion::ingest_pages(&entry.index, &mut writer, &pages)
    }
}

impl std::fmt::Debug for TantivyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyBackend")
            .field("partitions", &self.partitions())
            .finish_non_exhaustive()
    }
}
