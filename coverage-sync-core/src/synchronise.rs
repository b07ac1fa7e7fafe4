//! High-level pipeline: read → aggregate → build → publish, one report per (commit, language).
//!
//! This module provides the top-level orchestration for a coverage synchronisation run:
//!   - Reads the project list and all coverage rows through a [`RecordSource`]
//!   - Groups the rows per commit and per language (see [`crate::aggregate`])
//!   - Resolves each commit's project to a provider/owner/repo route
//!   - Builds one [`crate::report::CoverageReport`] per language and hands it to a [`CoveragePublisher`]
//!   - Returns a [`SynchroniseReport`] describing what was published, skipped or failed
//!
//! # Failure policy
//! Only reading the inputs is fatal. A commit without a usable project or uuid is
//! skipped; a language whose report fails to build or publish is recorded and the
//! remaining languages and commits still run. There are no retries.
//!
//! A commit whose uuid is NULL, or whose project lacks provider, owner or repo
//! name, is skipped rather than posted with a `None` placeholder in the URL;
//! such a request can never address a real commit.
//!
//! # Pacing
//! After every processed commit the driver sleeps for [`SynchroniseConfig::pause`].
//! Skipped commits do not pause.

use tracing::{debug, error, info, warn};

use crate::aggregate::{aggregate_commits, CommitAggregate, CommitAggregates, FileEntry};
use crate::config::SynchroniseConfig;
use crate::contract::{CoveragePublisher, PublishRequest, RecordSource};
use crate::error::SyncError;
use crate::report::build_report;
use crate::resolve::{ProjectIndex, ProjectRoute};

/// Outcome of a full run.
#[derive(Debug, Default)]
pub struct SynchroniseReport {
    pub commits: Vec<CommitReport>,
}

#[derive(Debug)]
pub struct CommitReport {
    pub commit_id: i64,
    pub commit_uuid: Option<String>,
    pub outcome: CommitOutcome,
}

#[derive(Debug)]
pub enum CommitOutcome {
    /// The project resolved; every language bucket was attempted.
    Processed {
        provider: String,
        owner: String,
        repo: String,
        languages: Vec<LanguageReport>,
    },
    /// No project record matches the commit's project id.
    ProjectMissing { project_id: Option<i64> },
    /// The project exists but has no provider, owner or repo name.
    ProjectIncomplete { project_id: i64 },
    /// The commit has no external uuid to address it by.
    UuidMissing,
}

#[derive(Debug)]
pub struct LanguageReport {
    pub language: Option<String>,
    pub files: usize,
    pub outcome: LanguageOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LanguageOutcome {
    Published { status: u16 },
    Rejected { status: u16 },
    BuildFailed { error: String },
    PublishFailed { error: String },
}

/// Counters over a [`SynchroniseReport`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub commits: usize,
    pub skipped_commits: usize,
    pub published: usize,
    pub rejected: usize,
    pub build_failed: usize,
    pub publish_failed: usize,
}

impl SynchroniseReport {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            commits: self.commits.len(),
            ..RunSummary::default()
        };
        for commit in &self.commits {
            let CommitOutcome::Processed { languages, .. } = &commit.outcome else {
                summary.skipped_commits += 1;
                continue;
            };
            for language in languages {
                match language.outcome {
                    LanguageOutcome::Published { .. } => summary.published += 1,
                    LanguageOutcome::Rejected { .. } => summary.rejected += 1,
                    LanguageOutcome::BuildFailed { .. } => summary.build_failed += 1,
                    LanguageOutcome::PublishFailed { .. } => summary.publish_failed += 1,
                }
            }
        }
        summary
    }
}

/// Entrypoint: read both inputs from `source`, then publish every commit.
///
/// Fails only when one of the inputs cannot be read.
pub async fn synchronise<S, P>(
    config: &SynchroniseConfig,
    source: &S,
    publisher: &P,
) -> Result<SynchroniseReport, SyncError>
where
    S: RecordSource + ?Sized,
    P: CoveragePublisher + ?Sized,
{
    info!("[SYNC] Starting coverage synchronisation");

    let projects = source.fetch_projects().await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Failed to fetch projects");
        SyncError::from(e)
    })?;
    let index = ProjectIndex::build(projects);
    if index.is_empty() {
        warn!("[SYNC] Project index is empty; every commit will be skipped");
    } else {
        info!(projects = index.len(), "[SYNC] Project index built");
    }

    let rows = source.fetch_coverage_rows().await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Failed to fetch coverage rows");
        SyncError::from(e)
    })?;
    let commits = aggregate_commits(rows);

    let report = publish_commits(config, publisher, &index, &commits).await;
    let summary = report.summary();
    info!(
        commits = summary.commits,
        skipped_commits = summary.skipped_commits,
        published = summary.published,
        rejected = summary.rejected,
        build_failed = summary.build_failed,
        publish_failed = summary.publish_failed,
        "[SYNC] Synchronisation finished"
    );
    Ok(report)
}

/// Walks `commits` in ascending id order and publishes every language bucket.
pub async fn publish_commits<P>(
    config: &SynchroniseConfig,
    publisher: &P,
    index: &ProjectIndex,
    commits: &CommitAggregates,
) -> SynchroniseReport
where
    P: CoveragePublisher + ?Sized,
{
    let mut reports = Vec::with_capacity(commits.len());

    for (&commit_id, aggregate) in commits {
        let report = publish_commit(config, publisher, index, commit_id, aggregate).await;
        let processed = matches!(report.outcome, CommitOutcome::Processed { .. });
        reports.push(report);

        if processed && !config.pause.is_zero() {
            info!(
                pause_ms = config.pause.as_millis() as u64,
                "[SYNC] Taking a breath before the next commit"
            );
            tokio::time::sleep(config.pause).await;
        }
    }

    SynchroniseReport { commits: reports }
}

async fn publish_commit<P>(
    config: &SynchroniseConfig,
    publisher: &P,
    index: &ProjectIndex,
    commit_id: i64,
    aggregate: &CommitAggregate,
) -> CommitReport
where
    P: CoveragePublisher + ?Sized,
{
    let skipped = |outcome: CommitOutcome| CommitReport {
        commit_id,
        commit_uuid: aggregate.commit_uuid.clone(),
        outcome,
    };

    let Some(project) = index.resolve(aggregate.project_id) else {
        let err = SyncError::ProjectNotFound {
            project_id: aggregate.project_id,
        };
        warn!(commit_id, error = %err, "[SYNC][SKIP] No project was found for this commit");
        return skipped(CommitOutcome::ProjectMissing {
            project_id: aggregate.project_id,
        });
    };

    let Some(route) = project.route() else {
        warn!(
            commit_id,
            project_id = project.project_id,
            provider = ?project.provider,
            owner = ?project.owner,
            repo = ?project.repo_name,
            "[SYNC][SKIP] Project has no complete provider/owner/repo"
        );
        return skipped(CommitOutcome::ProjectIncomplete {
            project_id: project.project_id,
        });
    };

    let Some(commit_uuid) = aggregate.commit_uuid.as_deref() else {
        warn!(commit_id, repo = route.repo, "[SYNC][SKIP] Commit has no uuid");
        return skipped(CommitOutcome::UuidMissing);
    };

    info!(
        commit_id,
        commit_uuid,
        repo = route.repo,
        languages = aggregate.languages.len(),
        files = aggregate.file_count(),
        "[SYNC] Processing coverage for commit"
    );

    let mut languages = Vec::with_capacity(aggregate.languages.len());
    for (language, entries) in &aggregate.languages {
        let outcome = publish_language(
            config,
            publisher,
            &route,
            commit_uuid,
            language.as_deref(),
            entries,
        )
        .await;
        languages.push(LanguageReport {
            language: language.clone(),
            files: entries.len(),
            outcome,
        });
    }

    CommitReport {
        commit_id,
        commit_uuid: aggregate.commit_uuid.clone(),
        outcome: CommitOutcome::Processed {
            provider: route.provider.to_string(),
            owner: route.owner.to_string(),
            repo: route.repo.to_string(),
            languages,
        },
    }
}

async fn publish_language<P>(
    config: &SynchroniseConfig,
    publisher: &P,
    route: &ProjectRoute<'_>,
    commit_uuid: &str,
    language: Option<&str>,
    entries: &[FileEntry],
) -> LanguageOutcome
where
    P: CoveragePublisher + ?Sized,
{
    let language_label = language.unwrap_or("<null>");

    let report = match build_report(entries) {
        Ok(report) => report,
        Err(e) => {
            let err = SyncError::from(e);
            error!(commit_uuid, language = language_label, error = %err, "[SYNC][ERROR] Report build failed");
            return LanguageOutcome::BuildFailed {
                error: err.to_string(),
            };
        }
    };
    debug!(
        commit_uuid,
        language = language_label,
        files = report.file_reports.len(),
        "[SYNC] Report built"
    );

    let req = PublishRequest {
        api_token: &config.api_token,
        provider: route.provider,
        owner: route.owner,
        repo: route.repo,
        commit_uuid,
        language,
        report: &report,
    };

    match publisher.publish(req).await {
        Ok(resp) if resp.is_success() => {
            info!(commit_uuid, language = language_label, status = resp.status, "[SYNC][PUBLISH] Coverage published");
            LanguageOutcome::Published {
                status: resp.status,
            }
        }
        Ok(resp) => {
            warn!(
                commit_uuid,
                language = language_label,
                status = resp.status,
                body = %resp.body,
                "[SYNC][PUBLISH] Coverage rejected by the service"
            );
            LanguageOutcome::Rejected {
                status: resp.status,
            }
        }
        Err(e) => {
            let err = SyncError::from(e);
            error!(commit_uuid, language = language_label, error = %err, "[SYNC][ERROR][PUBLISH] Publish call failed");
            LanguageOutcome::PublishFailed {
                error: err.to_string(),
            }
        }
    }
}
