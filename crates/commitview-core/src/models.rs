//! Core data models for indexed commits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::MalformedKey;

/// Opaque repository identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(Uuid);

impl RepoId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RepoId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RepoId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for RepoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a commit: its hex hash plus commit time in seconds
///
/// Equality and hashing use the hash only. [`CommitKey::chronological`]
/// orders by commit time with the hash as tie-breaker. There is no `Ord`
/// impl since it would have to agree with hash-only equality.
/// The marshalled form is `<hash>-<timestamp>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitKey {
    hash: String,
    timestamp: i32,
}

impl CommitKey {
    pub fn new(hash: impl Into<String>, timestamp: i32) -> Self {
        Self {
            hash: hash.into(),
            timestamp,
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn timestamp(&self) -> i32 {
        self.timestamp
    }

    /// Abbreviated hash for display
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(8)]
    }

    /// Commit time ascending, then hash
    pub fn chronological(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.hash.cmp(&other.hash))
    }

    /// Encodes the key as `<hash>-<timestamp>`
    pub fn marshal(&self) -> String {
        format!("{}-{}", self.hash, self.timestamp)
    }

    /// Parses a marshalled key by splitting on the final hyphen
    ///
    /// Commit hashes are hex and never contain a hyphen, so a doubled hyphen
    /// before the timestamp is read as a negative sign.
    pub fn unmarshal(s: &str) -> Result<Self, MalformedKey> {
        let (hash, time) = s
            .rsplit_once('-')
            .ok_or_else(|| MalformedKey(s.to_string()))?;
        let (hash, negative) = match hash.strip_suffix('-') {
            Some(stripped) => (stripped, true),
            None => (hash, false),
        };
        if hash.is_empty() || hash.contains('-') || time.is_empty() {
            return Err(MalformedKey(s.to_string()));
        }
        let magnitude: i64 = time.parse().map_err(|_| MalformedKey(s.to_string()))?;
        let value = if negative { -magnitude } else { magnitude };
        let timestamp = i32::try_from(value).map_err(|_| MalformedKey(s.to_string()))?;
        Ok(Self::new(hash, timestamp))
    }
}

impl PartialEq for CommitKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for CommitKey {}

impl Hash for CommitKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl FromStr for CommitKey {
    type Err = MalformedKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::unmarshal(s)
    }
}

impl fmt::Display for CommitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marshal())
    }
}

/// One file-level change relative to the first parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeFile {
    Added { path: String },
    Modified { path: String },
    Deleted { path: String },
    Renamed { from: String, to: String },
    Copied { from: String, to: String },
}

impl ChangeFile {
    /// The path the change lands on (destination for renames and copies)
    pub fn path(&self) -> &str {
        match self {
            ChangeFile::Added { path }
            | ChangeFile::Modified { path }
            | ChangeFile::Deleted { path } => path,
            ChangeFile::Renamed { to, .. } | ChangeFile::Copied { to, .. } => to,
        }
    }

    /// Single-letter status as printed by `git log --name-status`
    pub fn status(&self) -> char {
        match self {
            ChangeFile::Added { .. } => 'A',
            ChangeFile::Modified { .. } => 'M',
            ChangeFile::Deleted { .. } => 'D',
            ChangeFile::Renamed { .. } => 'R',
            ChangeFile::Copied { .. } => 'C',
        }
    }
}

impl fmt::Display for ChangeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeFile::Renamed { from, to } | ChangeFile::Copied { from, to } => {
                write!(f, "{} {} -> {}", self.status(), from, to)
            }
            _ => write!(f, "{} {}", self.status(), self.path()),
        }
    }
}

/// A commit as produced by the walker or rehydrated for a query result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub repo_id: RepoId,

    pub key: CommitKey,

    /// First parent, absent for root commits
    pub parent: Option<CommitKey>,

    /// Local branches this commit is reachable from
    pub branches: BTreeSet<String>,

    pub author: String,

    /// Commit time in UTC seconds
    pub timestamp: i64,

    pub message: String,

    pub is_merge: bool,

    pub changes: Vec<ChangeFile>,
}

impl CommitRecord {
    pub fn date(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; {}; {}; {}",
            self.key.marshal(),
            self.date().format("%Y-%m-%d %H:%M:%S"),
            self.author,
            self.message.trim_end()
        )
    }
}

/// Branch name to tip commit, as last seen by the reconciler
///
/// Persisted as a list of `<hash>-<timestamp>-<branch>` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchTips(BTreeMap<String, CommitKey>);

impl BranchTips {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, branch: impl Into<String>, tip: CommitKey) -> Option<CommitKey> {
        self.0.insert(branch.into(), tip)
    }

    pub fn get(&self, branch: &str) -> Option<&CommitKey> {
        self.0.get(branch)
    }

    pub fn remove(&mut self, branch: &str) -> Option<CommitKey> {
        self.0.remove(branch)
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.0.contains_key(branch)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CommitKey)> {
        self.0.iter()
    }

    pub fn branches(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Encodes every branch as `<hash>-<timestamp>-<branch>`
    pub fn to_entries(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(branch, tip)| format!("{}-{}", tip.marshal(), branch))
            .collect()
    }

    /// Decodes entries written by [`BranchTips::to_entries`]
    pub fn from_entries<I, S>(entries: I) -> Result<Self, MalformedKey>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tips = Self::new();
        for entry in entries {
            let (branch, tip) = parse_tip_entry(entry.as_ref())?;
            tips.insert(branch, tip);
        }
        Ok(tips)
    }
}

impl FromIterator<(String, CommitKey)> for BranchTips {
    fn from_iter<T: IntoIterator<Item = (String, CommitKey)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for BranchTips {
    type Item = (String, CommitKey);
    type IntoIter = std::collections::btree_map::IntoIter<String, CommitKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Splits `<hash>-<timestamp>-<branch>`; the branch keeps any further hyphens
fn parse_tip_entry(entry: &str) -> Result<(String, CommitKey), MalformedKey> {
    let malformed = || MalformedKey(entry.to_string());
    let (hash, rest) = entry.split_once('-').ok_or_else(malformed)?;
    let (sign, rest) = match rest.strip_prefix('-') {
        Some(stripped) => ("-", stripped),
        None => ("", rest),
    };
    let (time, branch) = rest.split_once('-').ok_or_else(malformed)?;
    if branch.is_empty() {
        return Err(malformed());
    }
    let tip = CommitKey::unmarshal(&format!("{}-{}{}", hash, sign, time))?;
    Ok((branch.to_string(), tip))
}

/// A walk start point: a commit plus the branch names it is the tip of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub key: CommitKey,
    pub branches: BTreeSet<String>,
}

impl Seed {
    pub fn new(key: CommitKey, branch: impl Into<String>) -> Self {
        Self {
            key,
            branches: BTreeSet::from([branch.into()]),
        }
    }
}
