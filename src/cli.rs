//! Command-line surface, built with clap derive.
//!
//! Four subcommands, one per pipeline stage: `summarize`, `perturb`,
//! `judge`, `scores`. Provider and index-range options mirror the stage
//! defaults; `--verbose` is global.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::backend::Provider;

/// sumbench: batch summarization, perturbation and LLM-judging toolkit.
#[derive(Debug, Parser)]
#[command(name = "sumbench", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print each output path as it is written, and the full batch report.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Provider argument, mapped to [`Provider`] internally.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProviderArg {
    Anthropic,
    Openai,
    Gemini,
    Ollama,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Anthropic => Provider::Anthropic,
            ProviderArg::Openai => Provider::OpenAi,
            ProviderArg::Gemini => Provider::Gemini,
            ProviderArg::Ollama => Provider::Ollama,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarize a folder of PDFs through an LLM provider.
    Summarize {
        /// Provider to summarize with.
        #[arg(long, default_value = "anthropic")]
        provider: ProviderArg,

        /// Folder containing the PDF files.
        #[arg(long, default_value = "input_docs")]
        folder: PathBuf,

        /// Starting index (0-based, inclusive) into the sorted file listing.
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Ending index (exclusive). Omit to process through the last file.
        #[arg(long)]
        end: Option<usize>,

        /// Prompt guiding the summarization.
        #[arg(
            long,
            default_value = "Can you provide a summary of this article in 5 sentences?"
        )]
        prompt: String,

        /// Folder to save the summary text files in.
        #[arg(long, default_value = "results")]
        output: PathBuf,

        /// Model to use. Defaults to the provider's default model.
        #[arg(long)]
        model: Option<String>,

        /// Maximum tokens in the response.
        #[arg(long, default_value_t = 50_000)]
        max_tokens: u32,

        /// Sampling temperature.
        #[arg(long, default_value_t = 1.0)]
        temperature: f32,
    },

    /// Rewrite every summary in a folder in four fixed styles.
    Perturb {
        /// Provider to rewrite with.
        #[arg(long, default_value = "gemini")]
        provider: ProviderArg,

        /// Folder of summary .txt files to perturb.
        #[arg(long)]
        folder: PathBuf,

        /// Root under which the per-style output folders are created.
        #[arg(long, default_value = ".")]
        output: PathBuf,

        /// Starting index (0-based, inclusive) into the sorted listing.
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Ending index (exclusive). Omit to process through the last file.
        #[arg(long)]
        end: Option<usize>,

        /// Model to use. Defaults to the provider's default model.
        #[arg(long)]
        model: Option<String>,

        /// Maximum tokens per rewrite.
        #[arg(long, default_value_t = 700)]
        max_tokens: u32,

        /// Sampling temperature.
        #[arg(long, default_value_t = 1.0)]
        temperature: f32,
    },

    /// Score every summary in a folder against a rubric prompt.
    Judge {
        /// Provider acting as the judge.
        #[arg(long, default_value = "anthropic")]
        provider: ProviderArg,

        /// Folder of summary .txt files to judge.
        #[arg(long)]
        summaries: PathBuf,

        /// Folder holding the source papers the summaries came from.
        #[arg(long, default_value = "input_docs")]
        docs: PathBuf,

        /// Rubric prompt file; {summary} is replaced with the summary text.
        #[arg(long)]
        prompt_file: PathBuf,

        /// Output folder. Defaults to
        /// <provider>_judge_results_<kind>/<summary folder name>.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Model to use. Defaults to the provider's default model.
        #[arg(long)]
        model: Option<String>,

        /// Maximum tokens in the judgement.
        #[arg(long, default_value_t = 4096)]
        max_tokens: u32,

        /// Sampling temperature.
        #[arg(long, default_value_t = 0.2)]
        temperature: f32,
    },

    /// Aggregate judge JSONs into a meta CSV and a grouped averages CSV.
    Scores {
        /// Judge-result roots, each named <judge>_judge_results_<kind>.
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Output path for the per-judgement meta table.
        #[arg(long, default_value = "all_judgements_meta.csv")]
        meta: PathBuf,

        /// Output path for the grouped averages table.
        #[arg(long, default_value = "data_analysis/average_scores.csv")]
        averages: PathBuf,
    },
}
