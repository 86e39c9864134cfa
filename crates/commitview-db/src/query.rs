//! Exact-term boolean queries, result sorting and per-document filters

use commitview_core::IndexError;
use std::sync::atomic::{AtomicUsize, Ordering};
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Order, Term};

use crate::store::{DocId, IndexReader};

/// Default ceiling on clauses in a single boolean query
pub const DEFAULT_MAX_CLAUSE_COUNT: usize = 1024;

static MAX_CLAUSE_COUNT: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_CLAUSE_COUNT);

/// Current process-wide clause ceiling
pub fn max_clause_count() -> usize {
    MAX_CLAUSE_COUNT.load(Ordering::SeqCst)
}

/// Raises the clause ceiling to at least `at_least` until the guard drops
///
/// The previous ceiling is restored on drop, including on early return.
pub fn raise_clause_limit(at_least: usize) -> ClauseLimitGuard {
    let previous = MAX_CLAUSE_COUNT.fetch_max(at_least, Ordering::SeqCst);
    log::debug!("Clause limit raised from {} to {}", previous, previous.max(at_least));
    ClauseLimitGuard { previous }
}

/// Restores the clause ceiling when dropped
#[must_use = "the clause limit is restored as soon as the guard is dropped"]
pub struct ClauseLimitGuard {
    previous: usize,
}

impl Drop for ClauseLimitGuard {
    fn drop(&mut self) {
        MAX_CLAUSE_COUNT.store(self.previous, Ordering::SeqCst);
    }
}

/// Documents whose untokenized `field` holds exactly `value`
pub fn term_query(field: Field, value: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, value),
        IndexRecordOption::Basic,
    ))
}

/// Documents matching every clause
pub fn all_of(clauses: Vec<Box<dyn Query>>) -> Result<Box<dyn Query>, IndexError> {
    boolean(Occur::Must, clauses)
}

/// Documents matching at least one clause
pub fn any_of(clauses: Vec<Box<dyn Query>>) -> Result<Box<dyn Query>, IndexError> {
    boolean(Occur::Should, clauses)
}

fn boolean(occur: Occur, clauses: Vec<Box<dyn Query>>) -> Result<Box<dyn Query>, IndexError> {
    let limit = max_clause_count();
    if clauses.len() > limit {
        return Err(IndexError::TooManyClauses {
            count: clauses.len(),
            limit,
        });
    }
    Ok(Box::new(BooleanQuery::new(
        clauses.into_iter().map(|clause| (occur, clause)).collect(),
    )))
}

/// Sort order over an i64 fast field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    pub(crate) fn order(&self) -> Order {
        if self.descending {
            Order::Desc
        } else {
            Order::Asc
        }
    }
}

/// Per-document admission check applied to ranked hits
pub trait DocFilter {
    fn accept(&self, reader: &IndexReader, doc: DocId) -> Result<bool, IndexError>;
}
