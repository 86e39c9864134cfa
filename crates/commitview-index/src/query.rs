//! Paged commit queries by issue, project and version

use commitview_core::{
    CommitRecord, Error, IndexError, Issue, IssueSource, PermissionOracle, RepositorySource, User,
    Version, VersionSource,
};
use commitview_db::{
    any_of, max_clause_count, raise_clause_limit, term_query, DocFilter, DocId, IndexReader,
    IndexStore, Sort,
};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tantivy::query::Query;

use crate::filters::{PermittedIssuesFilter, ProjectFilter};
use crate::git::GitRepositoryService;
use crate::schema::{CommitSchema, FIELD_DATE};
use crate::service::RepositoryService;

/// Page of a query result, counted from zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
    pub ascending: bool,
}

impl Page {
    /// Newest commits first
    pub fn new(number: usize, size: usize) -> Self {
        Self {
            number,
            size,
            ascending: false,
        }
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    fn bounds(&self) -> (usize, usize) {
        let start = self.number.saturating_mul(self.size);
        (start, start.saturating_add(self.size))
    }
}

/// Answers commit queries from the index, rehydrating hits from the repositories
pub struct QueryEngine<S: RepositoryService = GitRepositoryService> {
    store: IndexStore,
    schema: CommitSchema,
    service: Arc<S>,
    repositories: Arc<dyn RepositorySource>,
    issues: Arc<dyn IssueSource>,
    versions: Arc<dyn VersionSource>,
    permissions: Arc<dyn PermissionOracle>,
    max_commits: usize,
}

impl<S: RepositoryService> QueryEngine<S> {
    pub fn new(
        store: IndexStore,
        service: Arc<S>,
        repositories: Arc<dyn RepositorySource>,
        issues: Arc<dyn IssueSource>,
        versions: Arc<dyn VersionSource>,
        permissions: Arc<dyn PermissionOracle>,
        max_commits: usize,
    ) -> Result<Self, IndexError> {
        let schema = CommitSchema::new(&store.schema())?;
        Ok(Self {
            store,
            schema,
            service,
            repositories,
            issues,
            versions,
            permissions,
            max_commits,
        })
    }

    /// Commits referencing the issue under its current or any prior key
    pub fn by_issue(&self, issue: &Issue, page: Page) -> Result<Vec<CommitRecord>, Error> {
        let mut keys = vec![issue.key.to_uppercase()];
        for prior in self.issues.prior_keys_for(issue) {
            let prior = prior.to_uppercase();
            if !keys.contains(&prior) {
                keys.push(prior);
            }
        }
        let query = any_of(
            keys.iter()
                .map(|key| term_query(self.schema.issue_key, key))
                .collect(),
        )?;
        self.run(&*query, None, page)
    }

    /// Commits on a project whose issues the user may see
    pub fn by_project(
        &self,
        project_key: &str,
        user: &User,
        page: Page,
    ) -> Result<Vec<CommitRecord>, Error> {
        let query = term_query(self.schema.project_key, &project_key.to_uppercase());
        let filter = ProjectFilter::new(
            self.schema.issue_key,
            self.issues.as_ref(),
            self.permissions.as_ref(),
            user,
        );
        self.run(&*query, Some(&filter), page)
    }

    /// Commits referencing issues fixed in or affecting a version
    ///
    /// Only issues the user may see are considered.
    pub fn by_version(
        &self,
        version: &Version,
        user: &User,
        page: Page,
    ) -> Result<Vec<CommitRecord>, Error> {
        let mut seen = HashSet::new();
        let mut permitted = Vec::new();
        let candidates = self
            .versions
            .issues_with_fix_version(version)
            .into_iter()
            .chain(self.versions.issues_with_affects_version(version));
        for issue in candidates {
            let key = issue.key.to_uppercase();
            if seen.insert(key.clone()) && self.permissions.can_view_commits(&issue, user) {
                permitted.push(key);
            }
        }
        if permitted.is_empty() {
            return Ok(Vec::new());
        }

        let _limit =
            (permitted.len() > max_clause_count()).then(|| raise_clause_limit(permitted.len()));
        let query = any_of(
            permitted
                .iter()
                .map(|key| term_query(self.schema.issue_key, key))
                .collect(),
        )?;
        let filter = PermittedIssuesFilter::new(self.schema.issue_key, permitted);
        self.run(&*query, Some(&filter), page)
    }

    fn run(
        &self,
        query: &dyn Query,
        filter: Option<&dyn DocFilter>,
        page: Page,
    ) -> Result<Vec<CommitRecord>, Error> {
        let (start, end) = page.bounds();
        if page.size == 0 {
            return Ok(Vec::new());
        }

        let reader = self.store.reader();
        let sort = if page.ascending {
            Sort::ascending(FIELD_DATE)
        } else {
            Sort::descending(FIELD_DATE)
        };
        let hits = reader.search(query, filter, self.max_commits, &sort)?;
        log::debug!("Query matched {} commits, paging [{}, {})", hits.total_hits, start, end);

        // Rehydrate only as many hits as the page needs; vanished commits are skipped
        let mut records = Vec::new();
        let mut cursor = 0;
        while records.len() < end && cursor < hits.doc_ids.len() {
            let want = (end - records.len()).min(hits.doc_ids.len() - cursor);
            let chunk = &hits.doc_ids[cursor..cursor + want];
            cursor += want;

            let rehydrated = chunk
                .par_iter()
                .map(|id| self.rehydrate(&reader, *id))
                .collect::<Result<Vec<_>, Error>>()?;
            records.extend(rehydrated.into_iter().flatten());
        }

        Ok(records.into_iter().skip(start).take(end - start).collect())
    }

    fn rehydrate(&self, reader: &IndexReader, id: DocId) -> Result<Option<CommitRecord>, Error> {
        let doc = reader.document(id)?;

        let Some(repo_id) = self
            .schema
            .repository_of(&doc)
            .and_then(|raw| self.repositories.parse_id(raw))
        else {
            log::warn!("Skipping document {:?} without a valid repository", id);
            return Ok(None);
        };
        let repository = match self.repositories.get_by_id(repo_id) {
            Ok(Some(repository)) => repository,
            Ok(None) => {
                log::warn!("Skipping commit of unknown repository {}", repo_id);
                return Ok(None);
            }
            Err(e) => {
                log::warn!("Skipping commit of repository {}: {}", repo_id, e);
                return Ok(None);
            }
        };
        let Some(git) = repository.as_git() else {
            return Ok(None);
        };

        let key = match self.schema.commit_key_of(&doc) {
            Some(Ok(key)) => key,
            Some(Err(e)) => {
                log::warn!("Skipping document {:?}: {}", id, e);
                return Ok(None);
            }
            None => return Ok(None),
        };

        match self.service.log_entry(git, &key) {
            Ok(mut record) => {
                if record.branches.is_empty() {
                    record.branches = self.schema.branches_of(&doc);
                }
                Ok(Some(record))
            }
            Err(e) => {
                log::warn!("Skipping commit {} of {}: {}", key, repo_id, e);
                Ok(None)
            }
        }
    }
}
