//! # contract: seams between the pipeline and the outside world
//!
//! The pipeline reads two bulk inputs (projects and coverage rows) through
//! [`RecordSource`] and hands every built report to a [`CoveragePublisher`].
//! Both traits are async and annotated for `mockall`, so test suites can drive
//! the whole pipeline with `MockRecordSource` / `MockCoveragePublisher`.
//!
//! Record types mirror the rows of the source queries. Joined columns are
//! optional because the queries use LEFT JOINs.

use async_trait::async_trait;

use mockall::automock;

use crate::error::{DataSourceError, PublishError};
use crate::report::CoverageReport;

/// One per-file coverage record, as read from the analysis database.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRow {
    pub commit_id: i64,
    pub file_id: i64,
    /// Serialized per-line coverage, decoded only when the report is built.
    pub coverage: Option<String>,
    /// External-facing commit identifier used in the publish URL.
    pub commit_uuid: Option<String>,
    pub project_id: Option<i64>,
    pub language: Option<String>,
    pub filename: Option<String>,
    pub total: Option<f64>,
}

/// One project joined with its organization, as read from the accounts database.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub project_id: i64,
    pub repo_name: Option<String>,
    pub organization_id: Option<i64>,
    pub owner: Option<String>,
    /// Hosting provider identifier, e.g. `gh`.
    pub provider: Option<String>,
}

/// Bulk reader for the two inputs of a run. Each method is called once per run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch every project together with its organization's provider.
    async fn fetch_projects(&self) -> Result<Vec<ProjectRecord>, DataSourceError>;

    /// Fetch every stored per-file coverage row.
    async fn fetch_coverage_rows(&self) -> Result<Vec<CoverageRow>, DataSourceError>;
}

/// URL segment used for a bucket whose stored language is NULL. Keeps it apart
/// from the empty-string bucket, which publishes to an empty trailing segment.
pub const NULL_LANGUAGE_SEGMENT: &str = "None";

/// Everything the sink needs to publish one (commit, language) report.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub api_token: &'a str,
    pub provider: &'a str,
    pub owner: &'a str,
    pub repo: &'a str,
    pub commit_uuid: &'a str,
    /// `None` when the stored language was NULL.
    pub language: Option<&'a str>,
    pub report: &'a CoverageReport,
}

impl PublishRequest<'_> {
    /// Language as it appears in the coverage endpoint path.
    pub fn language_segment(&self) -> &str {
        self.language.unwrap_or(NULL_LANGUAGE_SEGMENT)
    }
}

/// What the sink answered. Any HTTP status is a response, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResponse {
    pub status: u16,
    pub body: String,
}

impl PublishResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound sink for coverage reports.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CoveragePublisher: Send + Sync {
    /// Publish one report. Returns `Err` only if no response was obtained.
    async fn publish<'a>(&self, req: PublishRequest<'a>)
        -> Result<PublishResponse, PublishError>;
}
