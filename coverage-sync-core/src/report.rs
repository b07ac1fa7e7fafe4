//! Report builder: one publishable coverage report per (commit, language).

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::aggregate::FileEntry;
use crate::decode::decode_coverage;
use crate::error::DecodeError;

/// Body of one publish call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    /// Always zero; per-file totals are reported in `file_reports` only.
    pub total: u32,
    pub file_reports: Vec<FileReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub filename: Option<String>,
    #[serde(serialize_with = "serialize_total")]
    pub total: Option<f64>,
    pub coverage: Value,
}

/// Build the report for one language bucket, decoding every coverage blob.
/// The first malformed blob fails the whole report.
pub fn build_report(entries: &[FileEntry]) -> Result<CoverageReport, DecodeError> {
    let file_reports = entries
        .iter()
        .map(|entry| {
            Ok(FileReport {
                filename: entry.filename.clone(),
                total: entry.total,
                coverage: decode_coverage(entry.coverage.as_deref())?,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    Ok(CoverageReport {
        total: 0,
        file_reports,
    })
}

// Integral totals go out as JSON integers (80, not 80.0).
fn serialize_total<S>(total: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    match total {
        Some(value) if value.fract() == 0.0 && value.abs() <= MAX_EXACT => {
            serializer.serialize_i64(*value as i64)
        }
        Some(value) => serializer.serialize_f64(*value),
        None => serializer.serialize_none(),
    }
}
