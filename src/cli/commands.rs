use crate::config::RunConfig;
use crate::core::aggregator::workbook_total;
use crate::core::{
    aggregate_with_report, expand_with_report, run_pipeline, run_sync, RunSummary, SkippedFile,
    SyncStatus,
};
use crate::error::{GrigliaError, GrigliaResult};
use crate::excel::{extract_with, file_model, find_workbooks, write_expanded};
use crate::persist::XlsxSink;
use colored::Colorize;
use std::path::PathBuf;

/// Execute the run command: expand the folder and synchronize De_Para
pub fn run(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    translation: Option<PathBuf>,
    config_file: Option<PathBuf>,
    json: bool,
) -> GrigliaResult<()> {
    let config = match config_file {
        Some(path) => RunConfig::load(&path)?,
        None => RunConfig::default(),
    }
    .with_overrides(input, output, translation);

    if !json {
        println!("{}", "🧮 Griglia - Expand & Map".bold().green());
        println!("   Input:  {}", config.require_input_dir()?.display());
        println!("   Output: {}", config.output_path()?.display());
        if let Some(ref t) = config.translation_file {
            println!("   De_Para: {}", t.display());
        }
        println!();
    }

    let summary = run_pipeline(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Execute the expand command: aggregation and expansion only
pub fn expand(input: PathBuf, output: PathBuf) -> GrigliaResult<()> {
    println!("{}", "🧮 Griglia - Expand".bold().green());
    println!("   Input:  {}", input.display());
    println!("   Output: {}\n", output.display());

    let config = RunConfig::default();
    let paths = find_workbooks(&input)?;
    if paths.is_empty() {
        return Err(GrigliaError::NoWorkbooks(input));
    }

    let aggregated = aggregate_with_report(&paths, &config.layout)?;
    let expanded = expand_with_report(&paths, &aggregated.aggregate, &config.layout)?;
    write_expanded(&output, &expanded.rows)?;

    for file in &expanded.processed {
        println!(
            "   📄 {} (model {}): {} rows × {} groups → {}",
            file.path.display(),
            file.file_model.bright_blue(),
            file.data_rows,
            file.groups,
            file.rows
        );
    }
    print_skipped(&expanded.skipped);
    println!();
    println!("{}", "✅ Expansion Complete!".bold().green());
    println!("   {} rows written to {}\n", expanded.rows.len(), output.display());
    Ok(())
}

/// Execute the sync command against an existing expanded workbook
pub fn sync(expanded: PathBuf, translation: PathBuf, json: bool) -> GrigliaResult<()> {
    if !json {
        println!("{}", "🔁 Griglia - De_Para Sync".bold().green());
        println!("   Expanded: {}", expanded.display());
        println!("   De_Para:  {}\n", translation.display());
    }

    let status = run_sync(&expanded, &translation, &XlsxSink)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_sync_status(&status);
    }
    Ok(())
}

/// Execute the inspect command: show the grid header of one workbook
pub fn inspect(workbook: PathBuf) -> GrigliaResult<()> {
    println!("{}", "🔍 Griglia - Inspect".bold().green());
    println!("   File: {}\n", workbook.display());

    let handle = extract_with(&workbook, &RunConfig::default().layout)?;
    let groups = handle.column_groups();

    println!("   Sheet:      {}", handle.sheet_name().cyan());
    println!("   Model:      {}", handle.model_name().bold());
    println!("   Model code: {}", handle.model_code().bold());
    println!("   File model: {}", file_model(&workbook).bold());
    println!();

    println!("{}", format!("📊 Column groups ({})", groups.len()).bold().cyan());
    for group in &groups {
        println!(
            "   col {:>3}  version {:<12} SINCOM {:<12} volume head {}",
            group.column, group.version, group.sincom, group.volume_head
        );
    }
    println!();

    match workbook_total(&handle)? {
        Some((_, total)) => println!("   Total volume: {}", total.to_string().bold().green()),
        None => println!("   Total volume: {}", "none".yellow()),
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("{}", "📊 Workbooks:".bold().cyan());
    for file in &summary.processed {
        println!(
            "   📄 {} (model {}): {} rows × {} groups → {}",
            file.path.display(),
            file.file_model.bright_blue(),
            file.data_rows,
            file.groups,
            file.rows
        );
    }
    print_skipped(&summary.skipped);

    if !summary.volume_totals.is_empty() {
        println!("\n{}", "📐 Volume TT per model:".bold().cyan());
        for (model, total) in &summary.volume_totals {
            println!("   {} = {}", model.bright_blue(), total.to_string().bold());
        }
    }

    println!();
    println!("{}", "✅ Expansion Complete!".bold().green());
    println!(
        "   {} rows from {} workbooks saved to {}\n",
        summary.rows,
        summary.workbooks,
        summary.output_file.display()
    );

    print_sync_status(&summary.sync);
}

fn print_skipped(skipped: &[SkippedFile]) {
    for skip in skipped {
        println!("   {} {}: {}", "⚠️".yellow(), skip.path.display(), skip.reason.yellow());
    }
}

fn print_sync_status(status: &SyncStatus) {
    match status {
        SyncStatus::Skipped => {
            println!("{}", "ℹ️  De_Para file not given, skipping synchronization".yellow());
        }
        SyncStatus::NoNewData { reason, stats } => {
            println!("{}", "✅ De_Para already up to date".bold().green());
            println!("   {} ({} of {} rows matched a term)", reason, stats.matching_rows, stats.input_rows);
        }
        SyncStatus::Appended {
            count,
            path,
            fallback,
            ..
        } => {
            if *fallback {
                println!(
                    "{}",
                    "⚠️  De_Para workbook could not be updated in place".bold().yellow()
                );
                println!("   {} new rows saved to {}", count, path.display().to_string().bold());
            } else {
                println!("{}", "✅ De_Para Updated!".bold().green());
                println!("   {} new rows added to tb_de_para in {}", count, path.display());
            }
        }
        SyncStatus::Failed { error } => {
            println!("{} {}", "❌ De_Para synchronization failed:".bold().red(), error.red());
            println!("   The expanded file was still saved.");
        }
    }
    println!();
}
