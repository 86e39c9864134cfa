//! Commit document layout
//!
//! Every field except `message` is indexed as an exact term. `date` holds the
//! commit time in seconds as an i64 fast field, which is what results are
//! sorted by. The tips doc of a repository carries `branch-map=true` and one
//! `branch` entry per tip, encoded as `<hash>-<timestamp>-<branch>`.

use commitview_core::{
    project_key, BranchTips, CommitKey, CommitRecord, IndexError, KeyExtractor, MalformedKey,
    RepoId,
};
use commitview_db::{all_of, term_query};
use std::collections::{BTreeSet, HashSet};
use tantivy::query::Query;
use tantivy::schema::{Field, Schema, Value, FAST, INDEXED, STORED, STRING};
use tantivy::TantivyDocument;

pub const FIELD_REPOSITORY: &str = "repository";
pub const FIELD_COMMIT_KEY: &str = "commitkey";
pub const FIELD_BRANCH: &str = "branch";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_DATE: &str = "date";
pub const FIELD_ISSUE_KEY: &str = "issuekey";
pub const FIELD_PROJECT_KEY: &str = "projectkey";
pub const FIELD_BRANCH_MAP: &str = "branch-map";

const BRANCH_MAP_MARKER: &str = "true";

/// Builds the tantivy schema of the commit index
pub fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    // Exact-match keywords, stored for rehydration
    for name in [
        FIELD_REPOSITORY,
        FIELD_COMMIT_KEY,
        FIELD_BRANCH,
        FIELD_AUTHOR,
        FIELD_ISSUE_KEY,
        FIELD_PROJECT_KEY,
        FIELD_BRANCH_MAP,
    ] {
        builder.add_text_field(name, STRING | STORED);
    }

    builder.add_text_field(FIELD_MESSAGE, STORED);
    builder.add_i64_field(FIELD_DATE, INDEXED | STORED | FAST);

    builder.build()
}

/// Field handles resolved against an index's schema
#[derive(Debug, Clone, Copy)]
pub struct CommitSchema {
    pub repository: Field,
    pub commit_key: Field,
    pub branch: Field,
    pub author: Field,
    pub message: Field,
    pub date: Field,
    pub issue_key: Field,
    pub project_key: Field,
    pub branch_map: Field,
}

impl CommitSchema {
    /// Resolves every field, failing if the index was built with another layout
    pub fn new(schema: &Schema) -> Result<Self, IndexError> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| IndexError::Corrupt(format!("index has no {} field", name)))
        };
        Ok(Self {
            repository: field(FIELD_REPOSITORY)?,
            commit_key: field(FIELD_COMMIT_KEY)?,
            branch: field(FIELD_BRANCH)?,
            author: field(FIELD_AUTHOR)?,
            message: field(FIELD_MESSAGE)?,
            date: field(FIELD_DATE)?,
            issue_key: field(FIELD_ISSUE_KEY)?,
            project_key: field(FIELD_PROJECT_KEY)?,
            branch_map: field(FIELD_BRANCH_MAP)?,
        })
    }

    /// Builds the document indexed for one commit
    pub fn commit_document(
        &self,
        repo_id: RepoId,
        record: &CommitRecord,
        keys: &dyn KeyExtractor,
    ) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.repository, repo_id.to_string());
        doc.add_text(self.commit_key, record.key.marshal());
        for branch in &record.branches {
            doc.add_text(self.branch, branch);
        }
        if !record.author.is_empty() {
            doc.add_text(self.author, &record.author);
        }
        doc.add_text(self.message, &record.message);
        doc.add_i64(self.date, record.timestamp);

        let issue_keys = keys.extract_keys(&record.message);
        for key in &issue_keys {
            doc.add_text(self.issue_key, key);
        }
        let mut projects = HashSet::new();
        for key in &issue_keys {
            let project = project_key(key);
            if projects.insert(project) {
                doc.add_text(self.project_key, project);
            }
        }
        doc
    }

    /// Builds the tips doc recording the branch state a reconcile ended with
    pub fn tips_document(&self, repo_id: RepoId, tips: &BranchTips) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.repository, repo_id.to_string());
        doc.add_text(self.branch_map, BRANCH_MAP_MARKER);
        for entry in tips.to_entries() {
            doc.add_text(self.branch, entry);
        }
        doc
    }

    /// Decodes the branch entries of a tips doc
    pub fn tips_from_document(&self, doc: &TantivyDocument) -> Result<BranchTips, MalformedKey> {
        BranchTips::from_entries(texts(doc, self.branch))
    }

    pub fn branches_of(&self, doc: &TantivyDocument) -> BTreeSet<String> {
        texts(doc, self.branch).map(str::to_string).collect()
    }

    pub fn commit_key_of(&self, doc: &TantivyDocument) -> Option<Result<CommitKey, MalformedKey>> {
        text(doc, self.commit_key).map(CommitKey::unmarshal)
    }

    pub fn repository_of<'d>(&self, doc: &'d TantivyDocument) -> Option<&'d str> {
        text(doc, self.repository)
    }

    /// Every document of one repository
    pub fn repository_query(&self, repo_id: RepoId) -> Box<dyn Query> {
        term_query(self.repository, &repo_id.to_string())
    }

    /// The commit document of `key` in one repository
    pub fn commit_query(
        &self,
        repo_id: RepoId,
        key: &CommitKey,
    ) -> Result<Box<dyn Query>, IndexError> {
        all_of(vec![
            self.repository_query(repo_id),
            term_query(self.commit_key, &key.marshal()),
        ])
    }

    /// The tips doc of one repository
    pub fn tips_query(&self, repo_id: RepoId) -> Result<Box<dyn Query>, IndexError> {
        all_of(vec![
            self.repository_query(repo_id),
            term_query(self.branch_map, BRANCH_MAP_MARKER),
        ])
    }
}

fn text(doc: &TantivyDocument, field: Field) -> Option<&str> {
    doc.get_first(field).and_then(|v| v.as_str())
}

fn texts(doc: &TantivyDocument, field: Field) -> impl Iterator<Item = &str> {
    doc.get_all(field).filter_map(|v| v.as_str())
}
