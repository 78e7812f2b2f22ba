mod cli;
mod ui;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use walkdir::WalkDir;

use crate::cli::AppConfig;
use pngx::{PngxError, pipeline};

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.downcast_ref::<PngxError>() == Some(&PngxError::OutputNotSmaller) {
                eprintln!("pngx: {err}");
                return ExitCode::from(2);
            }
            eprintln!("pngx: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let parsed = cli::Cli::parse();
    let config = parsed.build()?;

    let targets = resolve_inputs(&config)?;
    if targets.is_empty() {
        anyhow::bail!("no PNG files found in the provided inputs");
    }

    let progress = ui::ProgressDispatcher::new(config.common.progress, targets.len());

    let mut failures = Vec::new();
    for path in &targets {
        progress.file_started(path);
        match process_file(path, &config) {
            Ok(outcome) => progress.file_finished(path, Some(outcome)),
            Err(err) => {
                progress.file_failed(path, &err);
                failures.push(err);
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        let first_not_smaller = failures
            .iter()
            .find(|e| e.downcast_ref::<PngxError>() == Some(&PngxError::OutputNotSmaller));
        if let Some(err) = first_not_smaller {
            return Err(anyhow::anyhow!("{err}"));
        }

        let mut message = String::from("one or more files failed during encoding:\n");
        for failure in &failures {
            message.push_str(" • ");
            message.push_str(&failure.to_string());
            message.push('\n');
        }
        anyhow::bail!(message);
    }
}

fn process_file(path: &Path, config: &AppConfig) -> Result<ui::FileOutcome> {
    let start = Instant::now();

    let output_path = pipeline::derive_output_path(path, "_pngx.png")
        .context("computing output path")?;

    if output_path.exists() && !config.common.overwrite {
        anyhow::bail!(
            "output file {} already exists (use --overwrite to replace)",
            output_path.display()
        );
    }

    let original_bytes =
        fs::read(path).with_context(|| format!("reading input PNG {}", path.display()))?;
    let original_size = original_bytes.len() as u64;

    let output = pipeline::encode_pngx(&original_bytes, &config.pngx_options)
        .with_context(|| format!("encoding {}", path.display()))?;
    let output_size = output.bytes.len() as u64;

    if config.common.dry_run {
        return Ok(ui::FileOutcome {
            original_size,
            output_size,
            elapsed: start.elapsed(),
            notes: Some(format!("dry run ({})", output.selected)),
        });
    }

    pipeline::write_atomic(&output_path, &output.bytes, config.common.overwrite)
        .with_context(|| format!("writing output PNG {}", output_path.display()))?;

    Ok(ui::FileOutcome {
        original_size,
        output_size,
        elapsed: start.elapsed(),
        notes: Some(output.selected.to_string()),
    })
}

fn resolve_inputs(config: &AppConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in &config.inputs {
        if input.is_dir() {
            collect_from_directory(input, &mut files)?;
        } else if is_png(input) {
            files.push(input.canonicalize().unwrap_or_else(|_| input.clone()));
        }
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    files.retain(|path| seen.insert(path.clone()));

    Ok(files)
}

fn collect_from_directory(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if is_png(path) {
            files.push(path.to_path_buf());
        }
    }

    Ok(())
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}
