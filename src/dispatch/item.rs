use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request parameters shared by every item in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSpec {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// One unit of work: a source document, its position in the sorted candidate
/// listing, and the batch request parameters.
///
/// `ordinal_index` is the position in the full sorted listing (not in the
/// selected slice), so the same file keeps the same index whatever range was
/// requested.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub source_path: PathBuf,
    pub ordinal_index: usize,
    pub request: RequestSpec,
}

/// Outcome status for one attempted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Failed,
}

/// The recorded outcome for one work item. Created once per attempt and
/// never mutated; a re-run produces a fresh record and overwrites the output
/// file by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub status: RecordStatus,
    /// Present iff `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ResultRecord {
    pub fn success(source_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            source_path,
            output_path,
            status: RecordStatus::Success,
            error_detail: None,
        }
    }

    pub fn failed(source_path: PathBuf, output_path: PathBuf, detail: String) -> Self {
        Self {
            source_path,
            output_path,
            status: RecordStatus::Failed,
            error_detail: Some(detail),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }
}

/// Everything a batch run needs besides the backend and the extractor.
#[derive(Debug, Clone)]
pub struct BatchSpec {
    pub input_folder: PathBuf,
    /// Candidate file extension, matched ASCII case-insensitively ("pdf").
    pub extension: String,
    /// Zero-based inclusive start of the index range.
    pub start: usize,
    /// Exclusive end of the index range; `None` means through the last file.
    pub end: Option<usize>,
    pub request: RequestSpec,
    pub output_folder: PathBuf,
    /// Appended to the source stem when naming the output file ("_summary").
    pub output_suffix: String,
}

impl BatchSpec {
    /// Output path for one source file: `<output_folder>/<stem><suffix>.txt`.
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_folder
            .join(format!("{stem}{}.txt", self.output_suffix))
    }
}

/// Tally of a finished batch, printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl BatchReport {
    /// Tally up the records of a run that began at `started_at`.
    pub fn from_records(records: &[ResultRecord], started_at: DateTime<Utc>) -> Self {
        let finished_at = Utc::now();
        let succeeded = records.iter().filter(|r| r.is_success()).count();
        Self {
            total: records.len(),
            succeeded,
            failed: records.len() - succeeded,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> BatchSpec {
        BatchSpec {
            input_folder: PathBuf::from("input_docs"),
            extension: "pdf".into(),
            start: 0,
            end: None,
            request: RequestSpec {
                prompt: "Summarize.".into(),
                model: "m".into(),
                max_tokens: 100,
                temperature: 1.0,
            },
            output_folder: PathBuf::from("results"),
            output_suffix: "_summary".into(),
        }
    }

    #[test]
    fn output_path_appends_suffix_and_txt() {
        let path = spec().output_path_for(Path::new("input_docs/paper_01.pdf"));
        assert_eq!(path, PathBuf::from("results/paper_01_summary.txt"));
    }

    #[test]
    fn output_path_drops_source_extension() {
        let path = spec().output_path_for(Path::new("summaries/a_summary.txt"));
        assert_eq!(path, PathBuf::from("results/a_summary_summary.txt"));
    }

    #[test]
    fn success_record_has_no_detail() {
        let record = ResultRecord::success("a.pdf".into(), "a_summary.txt".into());
        assert!(record.is_success());
        assert!(record.error_detail.is_none());
    }

    #[test]
    fn failed_record_carries_detail() {
        let record = ResultRecord::failed("a.pdf".into(), "a_summary.txt".into(), "boom".into());
        assert!(!record.is_success());
        assert_eq!(record.error_detail.as_deref(), Some("boom"));
    }

    #[test]
    fn serialized_success_omits_error_detail() {
        let record = ResultRecord::success("a.pdf".into(), "out.txt".into());
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("error_detail"));
        assert!(json.contains(r#""status":"success""#));
    }

    #[test]
    fn report_counts_split_by_status() {
        let records = vec![
            ResultRecord::success("a.pdf".into(), "a.txt".into()),
            ResultRecord::failed("b.pdf".into(), "b.txt".into(), "bad".into()),
            ResultRecord::success("c.pdf".into(), "c.txt".into()),
        ];
        let report = BatchReport::from_records(&records, Utc::now());
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn empty_report_counts_as_all_succeeded() {
        let report = BatchReport::from_records(&[], Utc::now());
        assert_eq!(report.total, 0);
        assert!(report.all_succeeded());
    }
}
