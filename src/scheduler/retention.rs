//! Pure retention selection: given the on-disk archives for a kind and a
//! keep-count policy, decide which ones the cleanup worker should delete.
//! Kept independent of the filesystem and the database so it's trivially
//! unit-testable (pattern grounded in a retention-report-style sweep: a
//! policy struct, a report struct, and a pure selection function that takes
//! plain data in and plain data out).

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::store::SourceFileKind;

#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub keep_full: i64,
    pub keep_delta: i64,
}

#[derive(Debug, Clone)]
pub struct RetentionCandidate {
    pub kind: SourceFileKind,
    pub downloaded_at: DateTime<Utc>,
    pub path: PathBuf,
}

#[derive(Debug, Default, Clone)]
pub struct RetentionReport {
    pub retained: usize,
    pub deleted: Vec<PathBuf>,
}

/// Given every known archive across both kinds, return the ones beyond the
/// policy's keep-count for their kind, most-recently-downloaded retained.
pub fn select_files_to_delete(
    candidates: &[RetentionCandidate],
    policy: &RetentionPolicy,
) -> RetentionReport {
    let mut full: Vec<&RetentionCandidate> = candidates
        .iter()
        .filter(|c| matches!(c.kind, SourceFileKind::Full))
        .collect();
    let mut delta: Vec<&RetentionCandidate> = candidates
        .iter()
        .filter(|c| matches!(c.kind, SourceFileKind::Delta))
        .collect();

    full.sort_by_key(|c| std::cmp::Reverse(c.downloaded_at));
    delta.sort_by_key(|c| std::cmp::Reverse(c.downloaded_at));

    let mut report = RetentionReport::default();

    for (group, keep) in [(&full, policy.keep_full), (&delta, policy.keep_delta)] {
        let keep = keep.max(0) as usize;
        report.retained += group.len().min(keep);
        report
            .deleted
            .extend(group.iter().skip(keep).map(|c| c.path.clone()));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(kind: SourceFileKind, minutes_ago: i64, name: &str) -> RetentionCandidate {
        RetentionCandidate {
            kind,
            downloaded_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
            path: PathBuf::from(name),
        }
    }

    #[test]
    fn keeps_most_recent_n_per_kind() {
        let candidates = vec![
            candidate(SourceFileKind::Full, 0, "full-3.zip"),
            candidate(SourceFileKind::Full, 60, "full-2.zip"),
            candidate(SourceFileKind::Full, 120, "full-1.zip"),
        ];
        let policy = RetentionPolicy { keep_full: 2, keep_delta: 5 };
        let report = select_files_to_delete(&candidates, &policy);
        assert_eq!(report.retained, 2);
        assert_eq!(report.deleted, vec![PathBuf::from("full-1.zip")]);
    }

    #[test]
    fn within_keep_count_deletes_nothing() {
        let candidates = vec![
            candidate(SourceFileKind::Delta, 0, "delta-1.zip"),
            candidate(SourceFileKind::Delta, 10, "delta-2.zip"),
        ];
        let policy = RetentionPolicy { keep_full: 2, keep_delta: 5 };
        let report = select_files_to_delete(&candidates, &policy);
        assert!(report.deleted.is_empty());
        assert_eq!(report.retained, 2);
    }

    #[test]
    fn kinds_are_tracked_independently() {
        let candidates = vec![
            candidate(SourceFileKind::Full, 0, "full-1.zip"),
            candidate(SourceFileKind::Full, 10, "full-2.zip"),
            candidate(SourceFileKind::Delta, 0, "delta-1.zip"),
        ];
        let policy = RetentionPolicy { keep_full: 1, keep_delta: 1 };
        let report = select_files_to_delete(&candidates, &policy);
        assert_eq!(report.deleted, vec![PathBuf::from("full-2.zip")]);
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let report = select_files_to_delete(&[], &RetentionPolicy { keep_full: 2, keep_delta: 5 });
        assert!(report.deleted.is_empty());
        assert_eq!(report.retained, 0);
    }
}
