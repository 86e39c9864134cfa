//! Commitview DB - Commit index store and repository registry
//!
//! The index store wraps a tantivy index: documents carry untokenized
//! string fields searchable by exact term with boolean queries, and are
//! written through atomic transactions. The registry keeps repository
//! descriptors in sled.

mod query;
mod registry;
mod store;

pub use query::{
    all_of, any_of, max_clause_count, raise_clause_limit, term_query, ClauseLimitGuard, DocFilter,
    Sort, DEFAULT_MAX_CLAUSE_COUNT,
};
pub use registry::RepositoryRegistry;
pub use store::{DocId, IndexReader, IndexStore, IndexWriter, PreparedCommit, SearchHits};
