//! The batch dispatcher: candidate listing, index-range selection and the
//! sequential process loop with per-item failure isolation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, CompletionRequest};
use crate::error::SumbenchError;
use crate::extract::Extractor;
use crate::ui::BatchProgress;

use super::item::{BatchSpec, ResultRecord, WorkItem};

/// List the files in `folder` carrying `extension` (ASCII case-insensitive),
/// sorted by file name.
///
/// The sort keeps index ranges reproducible across runs and machines;
/// filesystem enumeration order is never exposed. Directories and files with
/// other extensions are skipped.
pub fn list_candidates(folder: &Path, extension: &str) -> Result<Vec<PathBuf>, SumbenchError> {
    let entries =
        fs::read_dir(folder).map_err(|_| SumbenchError::FolderNotFound(folder.to_path_buf()))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches {
            candidates.push(path);
        }
    }
    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates)
}

/// Slice `candidates[start..end]`, `start` inclusive, `end` exclusive.
///
/// `end = None` means through the last element, and a provided `end` past
/// the candidate count is clamped. `start == candidates.len()` yields an
/// empty selection; a `start` strictly greater, or a provided `end <=
/// start`, is an `InvalidRange` error.
pub fn select_range(
    candidates: &[PathBuf],
    start: usize,
    end: Option<usize>,
) -> Result<Vec<PathBuf>, SumbenchError> {
    if let Some(end) = end {
        if end <= start {
            return Err(SumbenchError::InvalidRange(format!(
                "end index {end} must be greater than start index {start}"
            )));
        }
    }
    if start > candidates.len() {
        return Err(SumbenchError::InvalidRange(format!(
            "start index {start} exceeds candidate count {}",
            candidates.len()
        )));
    }
    let end = end.map_or(candidates.len(), |e| e.min(candidates.len()));
    Ok(candidates[start..end].to_vec())
}

/// Process one work item: extract the source text, invoke the backend, write
/// the response to `output_path`.
///
/// Every failure on the way is captured in the returned record; this
/// function never propagates a per-item error. The output file is written
/// only on success, through a handle scoped to the write.
pub async fn process_one(
    item: &WorkItem,
    backend: &impl Backend,
    extractor: &impl Extractor,
    output_path: &Path,
) -> ResultRecord {
    match try_process(item, backend, extractor, output_path).await {
        Ok(()) => ResultRecord::success(item.source_path.clone(), output_path.to_path_buf()),
        Err(detail) => {
            ResultRecord::failed(item.source_path.clone(), output_path.to_path_buf(), detail)
        }
    }
}

async fn try_process(
    item: &WorkItem,
    backend: &impl Backend,
    extractor: &impl Extractor,
    output_path: &Path,
) -> Result<(), String> {
    let content = extractor
        .extract(&item.source_path)
        .map_err(|e| e.to_string())?;
    let request = CompletionRequest {
        prompt: item.request.prompt.clone(),
        content,
        model: item.request.model.clone(),
        max_tokens: item.request.max_tokens,
        temperature: item.request.temperature,
    };
    let text = backend.invoke(&request).await.map_err(|e| e.to_string())?;
    fs::write(output_path, text.as_bytes()).map_err(|e| e.to_string())
}

/// Run a whole batch: list, select, create the output folder, then process
/// every selected file in order, one request at a time.
///
/// The output folder is created before the first backend call; failure there
/// is batch-fatal. Returns one record per attempted item, in selection
/// order. Re-running with identical arguments re-processes everything and
/// overwrites prior outputs.
pub async fn run_batch(
    spec: &BatchSpec,
    backend: &impl Backend,
    extractor: &impl Extractor,
    progress: &BatchProgress,
) -> Result<Vec<ResultRecord>, SumbenchError> {
    let candidates = list_candidates(&spec.input_folder, &spec.extension)?;
    let selected = select_range(&candidates, spec.start, spec.end)?;
    progress.set_total(selected.len() as u64);

    fs::create_dir_all(&spec.output_folder).map_err(|source| SumbenchError::OutputWrite {
        path: spec.output_folder.clone(),
        source,
    })?;

    let mut records = Vec::with_capacity(selected.len());
    for (offset, source) in selected.iter().enumerate() {
        let item = WorkItem {
            source_path: source.clone(),
            ordinal_index: spec.start + offset,
            request: spec.request.clone(),
        };
        let output_path = spec.output_path_for(source);
        progress.begin_item(source);
        let record = process_one(&item, backend, extractor, &output_path).await;
        if record.is_success() {
            progress.item_succeeded(&record.output_path);
        } else {
            let detail = record.error_detail.as_deref().unwrap_or("unknown error");
            progress.item_failed(&record.source_path, detail);
        }
        records.push(record);
    }
    Ok(records)
}
