//! Postgres-backed [`RecordSource`].
//!
//! Each bulk read opens its own connection, runs one query and closes the
//! connection again. There is no pooling: a run performs exactly two queries.
//! Columns are cast in SQL so the row structs below decode regardless of the
//! exact integer/enum/uuid column types in the schema.

use async_trait::async_trait;
use coverage_sync_core::contract::{CoverageRow, ProjectRecord, RecordSource};
use coverage_sync_core::error::DataSourceError;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Connection, FromRow};
use tracing::{info, warn};

use crate::load_config::DatabaseSettings;

const PROJECTS_QUERY: &str = r#"
    SELECT proj."id"::bigint AS proj_id, proj."name"::text AS repo, org."id"::bigint AS org_id,
           proj."owner"::text AS owner, org."provider"::text AS provider
    FROM "Project" AS proj
    LEFT JOIN "Teams_Organization" AS org ON (proj."organizationId" = org.id)
"#;

const COVERAGE_QUERY: &str = r#"
    SELECT cc."commitId"::bigint AS commit_id, cc."fileId"::bigint AS file_id,
           cc."coverage"::text AS coverage, c."uuid"::text AS uuid,
           rfd."projectId"::bigint AS project_id, "language"::text AS language,
           "filename"::text AS filename, "total"::float8 AS total
    FROM "Coverage_Coverage" AS cc
    LEFT JOIN "Result_File" AS rf ON (cc."fileId" = rf.id)
    LEFT JOIN "Result_FileData" AS rfd ON (rf."fileDataId" = rfd.id)
    LEFT JOIN "Commit" AS c ON (cc."commitId" = c.id)
"#;

#[derive(Debug, FromRow)]
struct ProjectRow {
    proj_id: i64,
    repo: Option<String>,
    org_id: Option<i64>,
    owner: Option<String>,
    provider: Option<String>,
}

impl From<ProjectRow> for ProjectRecord {
    fn from(row: ProjectRow) -> Self {
        ProjectRecord {
            project_id: row.proj_id,
            repo_name: row.repo,
            organization_id: row.org_id,
            owner: row.owner,
            provider: row.provider,
        }
    }
}

#[derive(Debug, FromRow)]
struct CoverageRecordRow {
    commit_id: i64,
    file_id: i64,
    coverage: Option<String>,
    uuid: Option<String>,
    project_id: Option<i64>,
    language: Option<String>,
    filename: Option<String>,
    total: Option<f64>,
}

impl From<CoverageRecordRow> for CoverageRow {
    fn from(row: CoverageRecordRow) -> Self {
        CoverageRow {
            commit_id: row.commit_id,
            file_id: row.file_id,
            coverage: row.coverage,
            commit_uuid: row.uuid,
            project_id: row.project_id,
            language: row.language,
            filename: row.filename,
            total: row.total,
        }
    }
}

pub struct PostgresSource {
    settings: DatabaseSettings,
}

impl PostgresSource {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self { settings }
    }

    fn connect_options(&self, database: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .username(&self.settings.username)
            .password(&self.settings.password)
            .database(database)
    }

    /// Connect to `database`, run `query` to completion and close the connection.
    async fn fetch_all<T>(
        &self,
        source_name: &str,
        database: &str,
        query: &str,
    ) -> Result<Vec<T>, DataSourceError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        info!(source = source_name, database, host = %self.settings.host, "Connecting to database");
        let mut conn = PgConnection::connect_with(&self.connect_options(database))
            .await
            .map_err(|e| DataSourceError::new(source_name, format!("connect to {database}: {e}")))?;

        let rows = sqlx::query_as::<_, T>(query).fetch_all(&mut conn).await;

        if let Err(e) = conn.close().await {
            warn!(source = source_name, error = %e, "Failed to close database connection cleanly");
        }

        let rows = rows.map_err(|e| DataSourceError::new(source_name, format!("query: {e}")))?;
        info!(source = source_name, rows = rows.len(), "Fetched rows");
        Ok(rows)
    }
}

#[async_trait]
impl RecordSource for PostgresSource {
    async fn fetch_projects(&self) -> Result<Vec<ProjectRecord>, DataSourceError> {
        let rows: Vec<ProjectRow> = self
            .fetch_all("projects", &self.settings.accounts_db, PROJECTS_QUERY)
            .await?;
        Ok(rows.into_iter().map(ProjectRecord::from).collect())
    }

    async fn fetch_coverage_rows(&self) -> Result<Vec<CoverageRow>, DataSourceError> {
        let rows: Vec<CoverageRecordRow> = self
            .fetch_all("coverage", &self.settings.analysis_db, COVERAGE_QUERY)
            .await?;
        Ok(rows.into_iter().map(CoverageRow::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_row_maps_onto_record() {
        let record = ProjectRecord::from(ProjectRow {
            proj_id: 9,
            repo: Some("widgets".into()),
            org_id: None,
            owner: Some("acme".into()),
            provider: Some("gh".into()),
        });
        assert_eq!(record.project_id, 9);
        assert_eq!(record.repo_name.as_deref(), Some("widgets"));
        assert_eq!(record.organization_id, None);
    }

    #[test]
    fn coverage_row_keeps_uuid_and_null_language() {
        let row = CoverageRow::from(CoverageRecordRow {
            commit_id: 5,
            file_id: 11,
            coverage: Some("{}".into()),
            uuid: Some("abc".into()),
            project_id: Some(9),
            language: None,
            filename: Some("a.py".into()),
            total: Some(80.0),
        });
        assert_eq!(row.commit_uuid.as_deref(), Some("abc"));
        assert_eq!(row.language, None);
    }

    #[tokio::test]
    async fn unreachable_database_is_a_data_source_error() {
        let source = PostgresSource::new(DatabaseSettings {
            host: "127.0.0.1".into(),
            port: 1,
            username: "nobody".into(),
            password: "nothing".into(),
            analysis_db: "analysis".into(),
            accounts_db: "accounts".into(),
        });
        let err = source.fetch_projects().await.expect_err("port 1 is closed");
        assert_eq!(err.source_name, "projects");
    }
}
