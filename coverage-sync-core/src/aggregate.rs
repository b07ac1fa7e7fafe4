//! Commit aggregator: folds flat coverage rows into commit -> language -> files.
//!
//! Grouping is exact on `commit_id`. The first row seen for a commit supplies
//! its `project_id` and `commit_uuid`; later rows are not checked against it.
//! Language buckets are keyed by the raw `Option<String>`, so a NULL language
//! and an empty-string language each form their own bucket.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::contract::CoverageRow;

/// One file's coverage inside a language bucket. The blob stays serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub filename: Option<String>,
    pub total: Option<f64>,
    pub coverage: Option<String>,
}

/// Language key of a bucket. `None` is the NULL language.
pub type LanguageKey = Option<String>;

#[derive(Debug, Clone, PartialEq)]
pub struct CommitAggregate {
    pub project_id: Option<i64>,
    pub commit_uuid: Option<String>,
    pub languages: BTreeMap<LanguageKey, Vec<FileEntry>>,
}

impl CommitAggregate {
    fn new(project_id: Option<i64>, commit_uuid: Option<String>) -> Self {
        Self {
            project_id,
            commit_uuid,
            languages: BTreeMap::new(),
        }
    }

    /// Total number of file entries across all languages.
    pub fn file_count(&self) -> usize {
        self.languages.values().map(Vec::len).sum()
    }
}

/// Aggregates keyed by `commit_id`; iteration is ascending by id.
pub type CommitAggregates = BTreeMap<i64, CommitAggregate>;

/// Single linear pass over `rows`. File entries keep their input order.
pub fn aggregate_commits<I>(rows: I) -> CommitAggregates
where
    I: IntoIterator<Item = CoverageRow>,
{
    let mut commits = CommitAggregates::new();
    let mut row_count = 0usize;

    for row in rows {
        row_count += 1;
        let aggregate = commits
            .entry(row.commit_id)
            .or_insert_with(|| CommitAggregate::new(row.project_id, row.commit_uuid.clone()));
        aggregate
            .languages
            .entry(row.language)
            .or_default()
            .push(FileEntry {
                filename: row.filename,
                total: row.total,
                coverage: row.coverage,
            });
    }

    info!(rows = row_count, commits = commits.len(), "Aggregated coverage rows by commit");
    debug!(
        buckets = commits.values().map(|c| c.languages.len()).sum::<usize>(),
        "Language buckets built"
    );
    commits
}
