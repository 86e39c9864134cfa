//! Tests for core data models

use anyhow::Result;
use commitview_core::{BranchTips, ChangeFile, CommitKey, CommitRecord, RepoId};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

// ── fixtures ─────────────────────────────────────────────────────────────────

const HASH_A: &str = "abc1234567890abcdef01234567890abcdef0123";
const HASH_B: &str = "def1234567890abcdef01234567890abcdef0456";

fn make_record() -> CommitRecord {
    CommitRecord {
        repo_id: RepoId::new(),
        key: CommitKey::new(HASH_A, 1_000_000_000),
        parent: None,
        branches: BTreeSet::from(["master".to_string()]),
        author: "Jane Doe".to_string(),
        timestamp: 1_000_000_000,
        message: "GCV-1 initial commit\n".to_string(),
        is_merge: false,
        changes: vec![ChangeFile::Added { path: "README".to_string() }],
    }
}

// ── commit key marshalling ───────────────────────────────────────────────────

#[test]
fn test_marshal_format() {
    let key = CommitKey::new(HASH_A, 1234567890);
    assert_eq!(key.marshal(), format!("{}-1234567890", HASH_A));
}

#[test]
fn test_unmarshal_inverts_marshal() -> Result<()> {
    let key = CommitKey::new(HASH_A, 1234567890);
    let back = CommitKey::unmarshal(&key.marshal())?;
    assert_eq!(back.hash(), HASH_A);
    assert_eq!(back.timestamp(), 1234567890);
    Ok(())
}

#[test]
fn test_unmarshal_negative_timestamp() -> Result<()> {
    let key = CommitKey::new(HASH_A, -42);
    assert_eq!(key.marshal(), format!("{}--42", HASH_A));
    assert_eq!(CommitKey::unmarshal(&key.marshal())?.timestamp(), -42);
    Ok(())
}

#[test]
fn test_unmarshal_rejects_garbage() {
    for bad in ["", "nohyphen", "-123", "abc-", "abc-notanumber", "abc-99999999999"] {
        assert!(CommitKey::unmarshal(bad).is_err(), "{bad:?} should be malformed");
    }
}

// ── commit key identity and order ────────────────────────────────────────────

#[test]
fn test_equality_uses_hash_only() {
    let a = CommitKey::new(HASH_A, 1);
    let b = CommitKey::new(HASH_A, 2);
    assert_eq!(a, b);

    let set: HashSet<CommitKey> = [a, b].into_iter().collect();
    assert_eq!(set.len(), 1);
}

#[test]
fn test_chronological_order_is_by_time_then_hash() {
    let older = CommitKey::new(HASH_B, 100);
    let newer = CommitKey::new(HASH_A, 200);
    assert_eq!(older.chronological(&newer), Ordering::Less);

    let tie_a = CommitKey::new(HASH_A, 100);
    let tie_b = CommitKey::new(HASH_B, 100);
    assert_eq!(tie_a.chronological(&tie_b), Ordering::Less);
    assert_eq!(tie_b.chronological(&tie_a), Ordering::Greater);
}

#[test]
fn test_chronological_order_is_transitive_across_equal_hashes() {
    let a = CommitKey::new(HASH_A, 5);
    let b = CommitKey::new(HASH_A, 1);
    let c = CommitKey::new(HASH_B, 3);
    assert_eq!(a, b);

    let mut keys = vec![a.clone(), c.clone(), b.clone()];
    keys.sort_by(CommitKey::chronological);
    let times: Vec<i32> = keys.iter().map(CommitKey::timestamp).collect();
    assert_eq!(times, vec![1, 3, 5]);
    assert_eq!(b.chronological(&c), Ordering::Less);
    assert_eq!(c.chronological(&a), Ordering::Less);
    assert_eq!(b.chronological(&a), Ordering::Less);
}

// ── branch tips ──────────────────────────────────────────────────────────────

#[test]
fn test_tip_entries_keep_hyphenated_branch_names() -> Result<()> {
    let mut tips = BranchTips::new();
    tips.insert("master", CommitKey::new(HASH_A, 10));
    tips.insert("feature-login-form", CommitKey::new(HASH_B, 20));

    let entries = tips.to_entries();
    assert!(entries.contains(&format!("{}-20-feature-login-form", HASH_B)));

    let back = BranchTips::from_entries(&entries)?;
    assert_eq!(back, tips);
    assert_eq!(back.get("feature-login-form").map(|k| k.timestamp()), Some(20));
    Ok(())
}

#[test]
fn test_tip_entry_without_branch_is_malformed() {
    let result = BranchTips::from_entries([format!("{}-20", HASH_A)]);
    assert!(result.is_err());
}

// ── display ──────────────────────────────────────────────────────────────────

#[test]
fn test_record_display() {
    let shown = make_record().to_string();
    assert_eq!(
        shown,
        format!("{}-1000000000; 2001-09-09 01:46:40; Jane Doe; GCV-1 initial commit", HASH_A)
    );
}

#[test]
fn test_change_file_display() {
    let renamed = ChangeFile::Renamed { from: "a.txt".to_string(), to: "b.txt".to_string() };
    assert_eq!(renamed.to_string(), "R a.txt -> b.txt");
    assert_eq!(renamed.path(), "b.txt");
    assert_eq!(ChangeFile::Deleted { path: "gone".to_string() }.to_string(), "D gone");
}
