//! Commit index on tantivy
//!
//! One tantivy index per directory. Writes go through a single
//! `tantivy::IndexWriter`, created on first use and shared by every clone of
//! the store, so at most one transaction is open at a time. Readers search
//! the last committed state.

use commitview_core::IndexError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tantivy::collector::{Count, DocSetCollector, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::Query;
use tantivy::schema::Schema;
use tantivy::{DocAddress, Index, ReloadPolicy, Searcher, TantivyDocument};

use crate::query::{DocFilter, Sort};

/// Address of a committed document
pub type DocId = DocAddress;

/// Heap shared by the writer's indexing thread
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// File tantivy writes once an index exists in a directory
const META_FILE: &str = "meta.json";

/// Persistent document index at one filesystem path
#[derive(Clone)]
pub struct IndexStore {
    index: Index,
    reader: tantivy::IndexReader,
    writer: Arc<Mutex<Option<tantivy::IndexWriter>>>,
    path: PathBuf,
}

impl IndexStore {
    /// Opens the index at `path`, creating it with `schema` if needed
    ///
    /// An existing index whose schema differs is rejected.
    pub fn open<P: AsRef<Path>>(path: P, schema: Schema) -> Result<Self, IndexError> {
        let path = path.as_ref();
        fs::create_dir_all(path)
            .map_err(|e| IndexError::io(format!("Failed to create index dir {:?}", path), e))?;
        let directory = MmapDirectory::open(path)
            .map_err(|e| IndexError::io(format!("Failed to open index dir {:?}", path), e))?;
        let index = Index::open_or_create(directory, schema)
            .map_err(|e| IndexError::io(format!("Failed to open index at {:?}", path), e))?;
        let reader: tantivy::IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| IndexError::io("Failed to create index reader", e))?;

        log::debug!("Opened commit index at {:?}", path);
        Ok(Self {
            index,
            reader,
            writer: Arc::new(Mutex::new(None)),
            path: path.to_path_buf(),
        })
    }

    /// Opens an index that must already exist
    pub fn open_existing<P: AsRef<Path>>(path: P, schema: Schema) -> Result<Self, IndexError> {
        if !path.as_ref().join(META_FILE).exists() {
            return Err(IndexError::NotInitialized(format!(
                "no index at {:?}",
                path.as_ref()
            )));
        }
        Self::open(path, schema)
    }

    pub fn schema(&self) -> Schema {
        self.index.schema()
    }

    /// Reader over the last committed state
    pub fn reader(&self) -> IndexReader {
        IndexReader {
            searcher: self.reader.searcher(),
        }
    }

    /// Starts a write transaction, waiting for any other writer on this store
    pub fn writer(&self) -> Result<IndexWriter<'_>, IndexError> {
        let mut slot = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            let writer = self
                .index
                .writer_with_num_threads(1, WRITER_HEAP_BYTES)
                .map_err(|e| IndexError::io("Failed to open index writer", e))?;
            *slot = Some(writer);
        }
        Ok(IndexWriter {
            slot,
            reader: &self.reader,
            pending: false,
        })
    }

    /// Number of committed documents
    pub fn document_count(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }

    /// On-disk size of the index files in bytes
    pub fn size_on_disk(&self) -> Result<u64, IndexError> {
        let mut total = 0;
        let entries = fs::read_dir(&self.path)
            .map_err(|e| IndexError::io(format!("Failed to list {:?}", self.path), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| IndexError::io("Failed to read index entry", e))?;
            let metadata = entry
                .metadata()
                .map_err(|e| IndexError::io("Failed to read index entry", e))?;
            if metadata.is_file() {
                total += metadata.len();
            }
        }
        Ok(total)
    }
}

/// Read access to one committed snapshot
#[derive(Clone)]
pub struct IndexReader {
    searcher: Searcher,
}

impl IndexReader {
    /// Every document matching `query`, in index order
    pub fn matching(&self, query: &dyn Query) -> Result<Vec<DocId>, IndexError> {
        let mut ids: Vec<DocId> = self
            .searcher
            .search(query, &DocSetCollector)
            .map_err(|e| IndexError::io("Failed to search index", e))?
            .into_iter()
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Loads a committed document
    pub fn document(&self, id: DocId) -> Result<TantivyDocument, IndexError> {
        self.searcher
            .doc(id)
            .map_err(|e| IndexError::io(format!("Failed to load document {:?}", id), e))
    }

    /// Runs `query`, orders hits by `sort`, admits them through `filter` and keeps `limit`
    ///
    /// `total_hits` counts matches before filtering. Equal sort values keep
    /// index order, which is insertion order within a commit.
    pub fn search(
        &self,
        query: &dyn Query,
        filter: Option<&dyn DocFilter>,
        limit: usize,
        sort: &Sort,
    ) -> Result<SearchHits, IndexError> {
        let total_hits = self
            .searcher
            .search(query, &Count)
            .map_err(|e| IndexError::io("Failed to count matches", e))?;
        if total_hits == 0 || limit == 0 {
            return Ok(SearchHits {
                total_hits,
                doc_ids: Vec::new(),
            });
        }

        // Rank every match so that ties and filtered hits cannot displace the cut
        let collector = TopDocs::with_limit(total_hits)
            .order_by_fast_field::<i64>(sort.field.clone(), sort.order());
        let mut ranked: Vec<(i64, DocAddress)> = self
            .searcher
            .search(query, &collector)
            .map_err(|e| IndexError::io(format!("Failed to search index by {}", sort.field), e))?;
        ranked.sort_by(|(va, da), (vb, db)| {
            let by_value = if sort.descending { vb.cmp(va) } else { va.cmp(vb) };
            by_value.then(da.cmp(db))
        });

        let mut doc_ids = Vec::with_capacity(limit.min(ranked.len()));
        for (_, id) in ranked {
            if doc_ids.len() == limit {
                break;
            }
            if let Some(filter) = filter {
                if !filter.accept(self, id)? {
                    continue;
                }
            }
            doc_ids.push(id);
        }
        Ok(SearchHits { total_hits, doc_ids })
    }
}

/// Search result: total matches plus the admitted, ordered document ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    pub total_hits: usize,
    pub doc_ids: Vec<DocId>,
}

/// A write transaction
///
/// Deletes and adds become visible together once the transaction commits.
/// Dropping the writer with uncommitted changes rolls them back.
pub struct IndexWriter<'a> {
    slot: MutexGuard<'a, Option<tantivy::IndexWriter>>,
    reader: &'a tantivy::IndexReader,
    pending: bool,
}

impl IndexWriter<'_> {
    fn inner(&mut self) -> Result<&mut tantivy::IndexWriter, IndexError> {
        self.slot
            .as_mut()
            .ok_or_else(|| IndexError::NotInitialized("index writer is closed".to_string()))
    }

    /// Deletes committed and earlier pending documents matching `query`
    pub fn delete_by_query(&mut self, query: Box<dyn Query>) -> Result<(), IndexError> {
        self.inner()?
            .delete_query(query)
            .map_err(|e| IndexError::io("Failed to delete documents", e))?;
        self.pending = true;
        Ok(())
    }

    pub fn add_document(&mut self, doc: TantivyDocument) -> Result<(), IndexError> {
        self.inner()?
            .add_document(doc)
            .map_err(|e| IndexError::io("Failed to add document", e))?;
        self.pending = true;
        Ok(())
    }

    /// Flushes every buffered change to disk without publishing it
    pub fn prepare_commit(&mut self) -> Result<PreparedCommit<'_>, IndexError> {
        let writer = self
            .slot
            .as_mut()
            .ok_or_else(|| IndexError::NotInitialized("index writer is closed".to_string()))?;
        let inner = writer
            .prepare_commit()
            .map_err(|e| IndexError::io("Failed to prepare index commit", e))?;
        Ok(PreparedCommit {
            inner,
            reader: self.reader,
            pending: &mut self.pending,
        })
    }

    /// Prepares and publishes every buffered change
    pub fn commit(&mut self) -> Result<(), IndexError> {
        self.prepare_commit()?.commit()
    }

    /// Discards every change since the last commit
    pub fn rollback(&mut self) -> Result<(), IndexError> {
        if self.pending {
            log::debug!("Rolling back index transaction");
        }
        self.inner()?
            .rollback()
            .map_err(|e| IndexError::io("Failed to roll back index transaction", e))?;
        self.pending = false;
        Ok(())
    }
}

impl Drop for IndexWriter<'_> {
    fn drop(&mut self) {
        if self.pending {
            if let Err(e) = self.rollback() {
                log::warn!("Failed to discard abandoned index transaction: {}", e);
            }
        }
    }
}

/// Changes flushed by [`IndexWriter::prepare_commit`], not yet visible to readers
pub struct PreparedCommit<'w> {
    inner: tantivy::PreparedCommit<'w>,
    reader: &'w tantivy::IndexReader,
    pending: &'w mut bool,
}

impl PreparedCommit<'_> {
    /// Publishes the prepared changes and refreshes readers
    pub fn commit(self) -> Result<(), IndexError> {
        self.inner
            .commit()
            .map_err(|e| IndexError::io("Failed to commit index transaction", e))?;
        *self.pending = false;
        self.reader
            .reload()
            .map_err(|e| IndexError::io("Failed to reload index reader", e))?;
        Ok(())
    }

    /// Drops the prepared changes
    pub fn abort(self) -> Result<(), IndexError> {
        self.inner
            .abort()
            .map_err(|e| IndexError::io("Failed to abort index transaction", e))?;
        *self.pending = false;
        Ok(())
    }
}
