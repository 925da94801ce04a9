//! Judge stage: have a model score each summary against a rubric prompt,
//! with the source paper supplied alongside.
//!
//! Each summary file is paired with its source document by paper id (the
//! summary stem minus its last `_`-separated segment). The judge reply is
//! saved as pretty JSON when it parses, raw text otherwise.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, CompletionRequest};
use crate::dispatch::{self, ResultRecord};
use crate::error::SumbenchError;
use crate::extract::Extractor;
use crate::ui::BatchProgress;

/// Options for one judging pass.
#[derive(Debug, Clone)]
pub struct JudgeSpec {
    /// Folder of summary `.txt` files to judge.
    pub summaries_folder: PathBuf,
    /// Folder holding the source papers the summaries were generated from.
    pub input_docs_folder: PathBuf,
    /// Rubric prompt template. `{summary}` is replaced with the summary
    /// text; the legacy `{file_id}` marker is replaced with a note that the
    /// paper text precedes the prompt.
    pub prompt_path: PathBuf,
    /// Explicit output folder. `None` derives
    /// `<provider>_judge_results_<judge kind>/<summary folder name>`.
    pub output_folder: Option<PathBuf>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl JudgeSpec {
    /// The judge kind is the last `_`-separated segment of the prompt file
    /// stem: `judge_full.txt` is a "full" judge.
    pub fn judge_kind(&self) -> String {
        let stem = self
            .prompt_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match stem.rsplit_once('_') {
            Some((_, kind)) => kind.to_string(),
            None => stem,
        }
    }

    /// Where judgements land for the given provider.
    pub fn resolve_output_folder(&self, provider: &str) -> PathBuf {
        match &self.output_folder {
            Some(path) => path.clone(),
            None => {
                let summary_name = self
                    .summaries_folder
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                PathBuf::from(format!("{provider}_judge_results_{}", self.judge_kind()))
                    .join(summary_name)
            }
        }
    }
}

/// Paper id for a summary file: the stem minus its last `_` segment, so
/// `paper_01_summary.txt` belongs to `paper_01.pdf`.
fn paper_id(summary_path: &Path) -> String {
    let stem = summary_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.rsplit_once('_') {
        Some((id, _)) => id.to_string(),
        None => stem,
    }
}

/// Judge every summary in the folder, sequentially, one record per summary.
///
/// Batch-fatal: missing input-docs folder, missing summary folder, missing
/// prompt file, unwritable output folder. A summary whose paired paper is
/// absent, or whose backend call fails, is recorded and skipped. Re-runs
/// overwrite prior judgements.
pub async fn run_judge(
    spec: &JudgeSpec,
    backend: &impl Backend,
    extractor: &impl Extractor,
    progress: &BatchProgress,
) -> Result<Vec<ResultRecord>, SumbenchError> {
    if !spec.input_docs_folder.is_dir() {
        return Err(SumbenchError::FolderNotFound(spec.input_docs_folder.clone()));
    }
    let template = fs::read_to_string(&spec.prompt_path)
        .map_err(|_| SumbenchError::PromptNotFound(spec.prompt_path.clone()))?;

    let summaries = dispatch::list_candidates(&spec.summaries_folder, "txt")?;
    progress.set_total(summaries.len() as u64);

    let output_folder = spec.resolve_output_folder(backend.name());
    fs::create_dir_all(&output_folder).map_err(|source| SumbenchError::OutputWrite {
        path: output_folder.clone(),
        source,
    })?;

    let mut records = Vec::with_capacity(summaries.len());
    for summary_path in &summaries {
        progress.begin_item(summary_path);
        let record =
            judge_one(spec, &template, summary_path, &output_folder, backend, extractor).await;
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

async fn judge_one(
    spec: &JudgeSpec,
    template: &str,
    summary_path: &Path,
    output_folder: &Path,
    backend: &impl Backend,
    extractor: &impl Extractor,
) -> ResultRecord {
    let id = paper_id(summary_path);
    match try_judge(spec, template, summary_path, &id, output_folder, backend, extractor).await {
        Ok(written) => ResultRecord::success(summary_path.to_path_buf(), written),
        Err(detail) => ResultRecord::failed(
            summary_path.to_path_buf(),
            output_folder.join(format!("{id}_judge.json")),
            detail,
        ),
    }
}

async fn try_judge(
    spec: &JudgeSpec,
    template: &str,
    summary_path: &Path,
    id: &str,
    output_folder: &Path,
    backend: &impl Backend,
    extractor: &impl Extractor,
) -> Result<PathBuf, String> {
    let paper_path = spec.input_docs_folder.join(format!("{id}.pdf"));
    if !paper_path.is_file() {
        return Err(format!("paired paper not found: {}", paper_path.display()));
    }

    let summary_text = fs::read_to_string(summary_path).map_err(|e| e.to_string())?;
    let paper_text = extractor.extract(&paper_path).map_err(|e| e.to_string())?;

    let prompt = template
        .replace("{file_id}", "[paper text above]")
        .replace("{summary}", &summary_text);
    let request = CompletionRequest {
        prompt,
        content: paper_text,
        model: spec.model.clone(),
        max_tokens: spec.max_tokens,
        temperature: spec.temperature,
    };
    let reply = backend.invoke(&request).await.map_err(|e| e.to_string())?;
    save_judgement(output_folder, id, &reply)
}

/// Slice the reply to its outermost `{...}` span when one exists. A slice
/// that parses as JSON is pretty-printed to `<id>_judge.json`; anything else
/// is saved verbatim to `<id>_judge.txt`.
fn save_judgement(folder: &Path, paper_id: &str, reply: &str) -> Result<PathBuf, String> {
    let mut text = reply.trim();
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            text = &text[start..=end];
        }
    }

    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => {
            let path = folder.join(format!("{paper_id}_judge.json"));
            let pretty = serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?;
            fs::write(&path, pretty).map_err(|e| e.to_string())?;
            Ok(path)
        }
        Err(_) => {
            let path = folder.join(format!("{paper_id}_judge.txt"));
            fs::write(&path, text).map_err(|e| e.to_string())?;
            Ok(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::extract::ExtractError;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Backend returning a fixed reply and capturing every request.
    struct RecordingBackend {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl RecordingBackend {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Backend for RecordingBackend {
        fn name(&self) -> &'static str {
            "anthropic"
        }

        async fn invoke(&self, req: &CompletionRequest) -> Result<String, BackendError> {
            self.seen.lock().unwrap().push(req.clone());
            Ok(self.reply.clone())
        }
    }

    /// Reads any file as plain text, whatever its extension.
    struct TextExtractor;

    impl Extractor for TextExtractor {
        fn extract(&self, path: &Path) -> Result<String, ExtractError> {
            fs::read_to_string(path).map_err(|source| ExtractError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    fn spec(summaries: &Path, docs: &Path, prompt: &Path, output: &Path) -> JudgeSpec {
        JudgeSpec {
            summaries_folder: summaries.to_path_buf(),
            input_docs_folder: docs.to_path_buf(),
            prompt_path: prompt.to_path_buf(),
            output_folder: Some(output.to_path_buf()),
            model: "judge-model".into(),
            max_tokens: 4096,
            temperature: 0.2,
        }
    }

    #[test]
    fn judge_kind_is_last_segment_of_prompt_stem() {
        let mut s = spec(
            Path::new("summaries"),
            Path::new("docs"),
            Path::new("llm_judge_prompts/judge_full.txt"),
            Path::new("out"),
        );
        assert_eq!(s.judge_kind(), "full");
        s.prompt_path = PathBuf::from("rubric.txt");
        assert_eq!(s.judge_kind(), "rubric");
    }

    #[test]
    fn derived_output_folder_names_provider_kind_and_summaries() {
        let s = JudgeSpec {
            output_folder: None,
            ..spec(
                Path::new("results/results_gemini_bullets"),
                Path::new("docs"),
                Path::new("judge_basic.txt"),
                Path::new("unused"),
            )
        };
        assert_eq!(
            s.resolve_output_folder("anthropic"),
            PathBuf::from("anthropic_judge_results_basic/results_gemini_bullets")
        );
    }

    #[test]
    fn paper_id_strips_last_suffix_segment() {
        assert_eq!(paper_id(Path::new("paper_01_summary.txt")), "paper_01");
        assert_eq!(paper_id(Path::new("abc.txt")), "abc");
    }

    #[test]
    fn parseable_reply_is_saved_as_pretty_json() {
        let dir = TempDir::new().unwrap();
        let reply = "Here is my assessment:\n{\"total_score\": 7}\nThank you.";
        let path = save_judgement(dir.path(), "paper_01", reply).unwrap();

        assert!(path.ends_with("paper_01_judge.json"));
        let saved = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(value["total_score"], 7);
        assert!(saved.contains('\n'));
    }

    #[test]
    fn unparseable_reply_falls_back_to_raw_text() {
        let dir = TempDir::new().unwrap();
        let path = save_judgement(dir.path(), "paper_01", "I refuse to answer in JSON.").unwrap();

        assert!(path.ends_with("paper_01_judge.txt"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "I refuse to answer in JSON."
        );
    }

    #[tokio::test]
    async fn judging_fills_template_and_carries_paper_text() {
        let summaries = TempDir::new().unwrap();
        let docs = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        fs::write(summaries.path().join("a_summary.txt"), "the summary").unwrap();
        fs::write(docs.path().join("a.pdf"), "the paper body").unwrap();
        let prompt_path = scratch.path().join("judge_full.txt");
        fs::write(&prompt_path, "Rate this summary: {summary}").unwrap();
        let output = scratch.path().join("judged");

        let s = spec(summaries.path(), docs.path(), &prompt_path, &output);
        let backend = RecordingBackend::new("{\"total_score\": 9}");
        let records = run_judge(&s, &backend, &TextExtractor, &BatchProgress::hidden())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].is_success());
        assert!(output.join("a_judge.json").exists());

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].prompt, "Rate this summary: the summary");
        assert_eq!(seen[0].content, "the paper body");
        assert_eq!(seen[0].temperature, 0.2);
    }

    #[tokio::test]
    async fn missing_paired_paper_fails_that_summary_only() {
        let summaries = TempDir::new().unwrap();
        let docs = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        fs::write(summaries.path().join("a_summary.txt"), "has a paper").unwrap();
        fs::write(summaries.path().join("b_summary.txt"), "orphan").unwrap();
        fs::write(docs.path().join("a.pdf"), "paper a").unwrap();
        let prompt_path = scratch.path().join("judge_full.txt");
        fs::write(&prompt_path, "{summary}").unwrap();
        let output = scratch.path().join("judged");

        let s = spec(summaries.path(), docs.path(), &prompt_path, &output);
        let backend = RecordingBackend::new("{\"score\": 1}");
        let records = run_judge(&s, &backend, &TextExtractor, &BatchProgress::hidden())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].is_success());
        assert!(!records[1].is_success());
        assert!(
            records[1]
                .error_detail
                .as_deref()
                .unwrap()
                .contains("paired paper not found")
        );
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_prompt_file_is_batch_fatal() {
        let summaries = TempDir::new().unwrap();
        let docs = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();

        let s = spec(
            summaries.path(),
            docs.path(),
            &scratch.path().join("nope.txt"),
            &scratch.path().join("judged"),
        );
        let backend = RecordingBackend::new("{}");
        let err = run_judge(&s, &backend, &TextExtractor, &BatchProgress::hidden())
            .await
            .unwrap_err();

        assert!(matches!(err, SumbenchError::PromptNotFound(_)));
    }

    #[tokio::test]
    async fn missing_input_docs_folder_is_batch_fatal() {
        let summaries = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let prompt_path = scratch.path().join("judge_full.txt");
        fs::write(&prompt_path, "{summary}").unwrap();

        let s = spec(
            summaries.path(),
            &scratch.path().join("no_docs"),
            &prompt_path,
            &scratch.path().join("judged"),
        );
        let backend = RecordingBackend::new("{}");
        let err = run_judge(&s, &backend, &TextExtractor, &BatchProgress::hidden())
            .await
            .unwrap_err();

        assert!(matches!(err, SumbenchError::FolderNotFound(_)));
    }
}
