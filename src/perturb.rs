//! Perturbation sweep: rewrite every summary in four fixed styles.
//!
//! Each style has its own instruction template with the summary text
//! embedded, and its own output folder named
//! `<summary folder name>_<style>`. The perturbed file keeps the original
//! file name, so downstream judging can pair it with the same source paper.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, CompletionRequest};
use crate::dispatch::{self, ResultRecord};
use crate::error::SumbenchError;
use crate::extract::Extractor;
use crate::ui::BatchProgress;

/// One of the fixed rewrite styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerturbationKind {
    Paraphrase,
    Long,
    Bullets,
    Shuffle,
}

impl PerturbationKind {
    /// Sweep order: every kind is applied to every selected summary.
    pub const ALL: [PerturbationKind; 4] = [
        PerturbationKind::Paraphrase,
        PerturbationKind::Long,
        PerturbationKind::Bullets,
        PerturbationKind::Shuffle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PerturbationKind::Paraphrase => "paraphrase",
            PerturbationKind::Long => "long",
            PerturbationKind::Bullets => "bullets",
            PerturbationKind::Shuffle => "shuffle",
        }
    }

    fn template(self) -> &'static str {
        match self {
            PerturbationKind::Paraphrase => {
                "Paraphrase the following summary using different wording and sentence \
                 structure. Do NOT add, remove, or change any information.\n\nSummary:\n{summary}"
            }
            PerturbationKind::Long => {
                "Rewrite the following summary to be longer by restating ideas and adding \
                 redundant explanations. Do NOT introduce new facts.\n\nSummary:\n{summary}"
            }
            PerturbationKind::Bullets => {
                "Convert the following summary into bullet points. Preserve all information \
                 and do not add anything new.\n\nSummary:\n{summary}"
            }
            PerturbationKind::Shuffle => {
                "Reorder the sentences in the following summary. \
                 Do NOT change, rephrase, add, or remove any sentence content. \
                 Only change the order of sentences.\n\nSummary:\n{summary}"
            }
        }
    }

    /// Fill the style's instruction template with the summary text.
    pub fn prompt_for(self, summary: &str) -> String {
        self.template().replace("{summary}", summary)
    }
}

impl fmt::Display for PerturbationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for one perturbation sweep.
#[derive(Debug, Clone)]
pub struct PerturbSpec {
    /// Folder of summary `.txt` files to rewrite.
    pub summaries_folder: PathBuf,
    /// Root under which the per-kind output folders are created.
    pub output_root: PathBuf,
    pub start: usize,
    pub end: Option<usize>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl PerturbSpec {
    fn output_folder_for(&self, kind: PerturbationKind) -> PathBuf {
        let folder_name = self
            .summaries_folder
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_root.join(format!("{folder_name}_{kind}"))
    }
}

/// Rewrite every selected summary in all four styles, sequentially.
///
/// Returns one record per (style, file) attempt. A failed rewrite, or an
/// empty backend reply, is recorded and skipped; the sweep continues.
pub async fn run_sweep(
    spec: &PerturbSpec,
    backend: &impl Backend,
    extractor: &impl Extractor,
    progress: &BatchProgress,
) -> Result<Vec<ResultRecord>, SumbenchError> {
    let candidates = dispatch::list_candidates(&spec.summaries_folder, "txt")?;
    let selected = dispatch::select_range(&candidates, spec.start, spec.end)?;
    progress.set_total((PerturbationKind::ALL.len() * selected.len()) as u64);

    let mut records = Vec::with_capacity(PerturbationKind::ALL.len() * selected.len());
    for kind in PerturbationKind::ALL {
        let output_folder = spec.output_folder_for(kind);
        fs::create_dir_all(&output_folder).map_err(|source| SumbenchError::OutputWrite {
            path: output_folder.clone(),
            source,
        })?;

        for source in &selected {
            let file_name = source.file_name().unwrap_or_default();
            let output_path = output_folder.join(file_name);
            progress.begin_item(source);
            let record = perturb_one(kind, source, &output_path, spec, backend, extractor).await;
            if record.is_success() {
                progress.item_succeeded(&record.output_path);
            } else {
                let detail = record.error_detail.as_deref().unwrap_or("unknown error");
                progress.item_failed(&record.source_path, detail);
            }
            records.push(record);
        }
    }
    Ok(records)
}

async fn perturb_one(
    kind: PerturbationKind,
    source: &Path,
    output_path: &Path,
    spec: &PerturbSpec,
    backend: &impl Backend,
    extractor: &impl Extractor,
) -> ResultRecord {
    match try_perturb(kind, source, output_path, spec, backend, extractor).await {
        Ok(()) => ResultRecord::success(source.to_path_buf(), output_path.to_path_buf()),
        Err(detail) => ResultRecord::failed(source.to_path_buf(), output_path.to_path_buf(), detail),
    }
}

async fn try_perturb(
    kind: PerturbationKind,
    source: &Path,
    output_path: &Path,
    spec: &PerturbSpec,
    backend: &impl Backend,
    extractor: &impl Extractor,
) -> Result<(), String> {
    let summary = extractor.extract(source).map_err(|e| e.to_string())?;
    let request = CompletionRequest {
        prompt: kind.prompt_for(&summary),
        content: String::new(),
        model: spec.model.clone(),
        max_tokens: spec.max_tokens,
        temperature: spec.temperature,
    };
    let text = backend.invoke(&request).await.map_err(|e| e.to_string())?;
    if text.trim().is_empty() {
        return Err("backend returned an empty rewrite".to_string());
    }
    fs::write(output_path, text.as_bytes()).map_err(|e| e.to_string())
}
