mod backend;
mod cli;
mod config;
mod dispatch;
mod error;
mod extract;
mod judge;
mod perturb;
mod scores;
mod ui;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use console::Style;

use backend::Provider;
use cli::{Cli, Command};
use config::SumbenchConfig;
use dispatch::{BatchReport, BatchSpec, RequestSpec, ResultRecord};
use extract::{PdfExtractor, PlainTextExtractor};
use judge::JudgeSpec;
use perturb::PerturbSpec;
use scores::ScoresSpec;
use ui::BatchProgress;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{} {err:#}", Style::new().red().bold().apply_to("error:"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let verbose = cli.verbose;
    match cli.command {
        Command::Summarize {
            provider,
            folder,
            start,
            end,
            prompt,
            output,
            model,
            max_tokens,
            temperature,
        } => {
            let provider: Provider = provider.into();
            let config = SumbenchConfig::load().context("loading configuration")?;
            let backend = config.backend(provider)?;
            let spec = BatchSpec {
                input_folder: folder,
                extension: "pdf".into(),
                start,
                end,
                request: RequestSpec {
                    prompt,
                    model: resolve_model(model, provider),
                    max_tokens,
                    temperature,
                },
                output_folder: output,
                output_suffix: "_summary".into(),
            };

            let progress = BatchProgress::start(0, &format!("summarizing via {provider}"), verbose);
            let started = Utc::now();
            let records = dispatch::run_batch(&spec, &backend, &PdfExtractor, &progress).await?;
            finish(&progress, &records, started, verbose);
        }

        Command::Perturb {
            provider,
            folder,
            output,
            start,
            end,
            model,
            max_tokens,
            temperature,
        } => {
            let provider: Provider = provider.into();
            let config = SumbenchConfig::load().context("loading configuration")?;
            let backend = config.backend(provider)?;
            let spec = PerturbSpec {
                summaries_folder: folder,
                output_root: output,
                start,
                end,
                model: resolve_model(model, provider),
                max_tokens,
                temperature,
            };

            let progress = BatchProgress::start(0, &format!("perturbing via {provider}"), verbose);
            let started = Utc::now();
            let records =
                perturb::run_sweep(&spec, &backend, &PlainTextExtractor, &progress).await?;
            finish(&progress, &records, started, verbose);
        }

        Command::Judge {
            provider,
            summaries,
            docs,
            prompt_file,
            output,
            model,
            max_tokens,
            temperature,
        } => {
            let provider: Provider = provider.into();
            let config = SumbenchConfig::load().context("loading configuration")?;
            let backend = config.backend(provider)?;
            let spec = JudgeSpec {
                summaries_folder: summaries,
                input_docs_folder: docs,
                prompt_path: prompt_file,
                output_folder: output,
                model: resolve_model(model, provider),
                max_tokens,
                temperature,
            };

            let progress = BatchProgress::start(0, &format!("judging via {provider}"), verbose);
            let started = Utc::now();
            let records = judge::run_judge(&spec, &backend, &PdfExtractor, &progress).await?;
            finish(&progress, &records, started, verbose);
        }

        Command::Scores {
            roots,
            meta,
            averages,
        } => {
            let spec = ScoresSpec {
                roots,
                meta_csv: meta,
                averages_csv: averages,
            };
            let (rows, groups) = scores::run_scores(&spec)?;
            println!(
                "  {} {rows} judgements -> {} ({groups} groups -> {})",
                Style::new().green().bold().apply_to("✓"),
                spec.meta_csv.display(),
                spec.averages_csv.display()
            );
        }
    }
    Ok(())
}

fn resolve_model(model: Option<String>, provider: Provider) -> String {
    model.unwrap_or_else(|| provider.default_model().to_string())
}

fn finish(
    progress: &BatchProgress,
    records: &[ResultRecord],
    started: chrono::DateTime<Utc>,
    verbose: bool,
) {
    let report = BatchReport::from_records(records, started);
    progress.finish(&report);
    if verbose {
        progress.print_report(&report);
    }
}
