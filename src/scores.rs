//! Score aggregation: collect judge JSONs into one meta CSV and a grouped
//! averages CSV. Purely local, no backend involved.
//!
//! The walk expects the folder layout the judge stage produces:
//! `<judge_model>_judge_results_<judge_prompt>/results_<generator>_<style>/`
//! with `*_judge.json` files inside. Folders that do not match the naming
//! scheme are skipped, as are roots that do not exist.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::SumbenchError;

/// Where the judge roots are and where the two tables go.
#[derive(Debug, Clone)]
pub struct ScoresSpec {
    /// Judge-result roots, each named `<judge_model>_judge_results_<kind>`.
    pub roots: Vec<PathBuf>,
    /// Output path for the per-judgement meta table.
    pub meta_csv: PathBuf,
    /// Output path for the grouped averages table.
    pub averages_csv: PathBuf,
}

/// One judgement flattened to meta columns plus its score values.
#[derive(Debug, Clone)]
pub struct JudgementRow {
    pub paper_id: String,
    pub judge_model: String,
    pub judge_prompt: String,
    pub generator_model: String,
    pub summary_style: String,
    /// Keyed by flattened JSON path ("factual_accuracy.score"); only keys
    /// ending in `.score` and the top-level `total_score` are kept.
    pub scores: BTreeMap<String, f64>,
}

/// `gemini_judge_results_basic` -> `(gemini, basic)`.
fn parse_judge_folder(name: &str) -> Option<(&str, &str)> {
    name.split_once("_judge_results_")
}

/// `results_anthropic_long` -> `(anthropic, long)`. The style may itself
/// contain underscores (`results_gemini_short_bullets`).
fn parse_results_folder(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix("results_")?;
    rest.split_once('_')
}

/// Flatten nested JSON objects with dot-separated keys.
fn flatten_json(value: &Value, prefix: &str, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_json(child, &child_key, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

/// A flattened key the meta table keeps: per-criterion `.score` leaves and
/// the judge's own top-level total.
fn is_score_key(key: &str) -> bool {
    key.ends_with(".score") || key == "total_score"
}

fn row_from_judgement(
    json_path: &Path,
    judge_model: &str,
    judge_prompt: &str,
    generator_model: &str,
    summary_style: &str,
) -> Result<JudgementRow, SumbenchError> {
    let raw = fs::read_to_string(json_path)?;
    let value: Value = serde_json::from_str(&raw)?;

    let mut flat = BTreeMap::new();
    flatten_json(&value, "", &mut flat);

    let scores = flat
        .into_iter()
        .filter(|(key, _)| is_score_key(key))
        .filter_map(|(key, value)| value.as_f64().map(|n| (key, n)))
        .collect();

    let paper_id = json_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
        .replace("_judge", "");

    Ok(JudgementRow {
        paper_id,
        judge_model: judge_model.to_string(),
        judge_prompt: judge_prompt.to_string(),
        generator_model: generator_model.to_string(),
        summary_style: summary_style.to_string(),
        scores,
    })
}

/// Walk the judge roots and collect every judgement row, plus the union of
/// score keys seen (the CSV's dynamic columns, sorted).
pub fn collect_rows(
    roots: &[PathBuf],
) -> Result<(Vec<JudgementRow>, BTreeSet<String>), SumbenchError> {
    let mut rows = Vec::new();
    let mut score_keys = BTreeSet::new();

    for root in roots {
        if !root.is_dir() {
            continue;
        }
        let root_name = root
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some((judge_model, judge_prompt)) = parse_judge_folder(&root_name) else {
            continue;
        };

        let mut results_dirs: Vec<PathBuf> = fs::read_dir(root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        results_dirs.sort();

        for results_dir in results_dirs {
            let dir_name = results_dir
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Some((generator_model, summary_style)) = parse_results_folder(&dir_name) else {
                continue;
            };

            let mut json_files: Vec<PathBuf> = fs::read_dir(&results_dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json")
                })
                .collect();
            json_files.sort();

            for json_path in json_files {
                let row = row_from_judgement(
                    &json_path,
                    judge_model,
                    judge_prompt,
                    generator_model,
                    summary_style,
                )?;
                score_keys.extend(row.scores.keys().cloned());
                rows.push(row);
            }
        }
    }

    if rows.is_empty() {
        return Err(SumbenchError::NoJudgements);
    }
    Ok((rows, score_keys))
}

const META_COLS: [&str; 5] = [
    "paper_id",
    "judge_model",
    "judge_prompt",
    "generator_model",
    "summary_style",
];

/// Create the folder a table path points into. A bare file name has an
/// empty parent and needs nothing created.
fn ensure_parent_dir(path: &Path) -> Result<(), SumbenchError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| SumbenchError::OutputWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

fn format_score(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Write the meta table: one row per judgement, meta columns first, then the
/// sorted score columns. A score absent from a judgement leaves its cell
/// empty.
pub fn write_meta_csv(
    path: &Path,
    rows: &[JudgementRow],
    score_keys: &BTreeSet<String>,
) -> Result<(), SumbenchError> {
    ensure_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    let header: Vec<&str> = META_COLS
        .iter()
        .copied()
        .chain(score_keys.iter().map(String::as_str))
        .collect();
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.paper_id.clone(),
            row.judge_model.clone(),
            row.judge_prompt.clone(),
            row.generator_model.clone(),
            row.summary_style.clone(),
        ];
        for key in score_keys {
            record.push(row.scores.get(key).map(|v| format_score(*v)).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }
    writer.flush().map_err(SumbenchError::Io)?;
    Ok(())
}

/// Group rows by `(judge_model, judge_prompt, generator_model,
/// summary_style)` and mean each score column over the rows where it is
/// present, rounded to 2 decimal places. Returns the number of groups
/// written. Output is sorted by the group key.
pub fn write_averages_csv(
    path: &Path,
    rows: &[JudgementRow],
    score_keys: &BTreeSet<String>,
) -> Result<usize, SumbenchError> {
    ensure_parent_dir(path)?;

    // group key -> (per-key sum, per-key count)
    type GroupKey = (String, String, String, String);
    let mut groups: BTreeMap<GroupKey, BTreeMap<String, (f64, usize)>> = BTreeMap::new();
    for row in rows {
        let key = (
            row.judge_model.clone(),
            row.judge_prompt.clone(),
            row.generator_model.clone(),
            row.summary_style.clone(),
        );
        let tally = groups.entry(key).or_default();
        for (score_key, value) in &row.scores {
            let entry = tally.entry(score_key.clone()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    let header: Vec<&str> = ["judge_model", "judge_prompt", "generator_model", "summary_style"]
        .into_iter()
        .chain(score_keys.iter().map(String::as_str))
        .collect();
    writer.write_record(&header)?;

    let group_count = groups.len();
    for ((judge_model, judge_prompt, generator_model, summary_style), tally) in groups {
        let mut record = vec![judge_model, judge_prompt, generator_model, summary_style];
        for key in score_keys {
            match tally.get(key) {
                Some((sum, count)) if *count > 0 => {
                    let mean = (sum / *count as f64 * 100.0).round() / 100.0;
                    record.push(format_score(mean));
                }
                _ => record.push(String::new()),
            }
        }
        writer.write_record(&record)?;
    }
    writer.flush().map_err(SumbenchError::Io)?;
    Ok(group_count)
}

/// Collect and write both tables. Returns `(judgement rows, groups)`.
pub fn run_scores(spec: &ScoresSpec) -> Result<(usize, usize), SumbenchError> {
    let (rows, score_keys) = collect_rows(&spec.roots)?;
    write_meta_csv(&spec.meta_csv, &rows, &score_keys)?;
    let groups = write_averages_csv(&spec.averages_csv, &rows, &score_keys)?;
    Ok((rows.len(), groups))
}
