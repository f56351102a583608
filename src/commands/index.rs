//! Index command - build vector indexes for semantic recall

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use recollect::core::entry::{GoalEntry, MemoryEntry, TextFields};
use recollect::core::paths::HomePaths;
use recollect::core::store::{read_json_sequence, StoreRead};
use recollect::search::{build_index_file, create_embedder, BuildOutcome, IndexArtifact};

#[derive(Serialize)]
struct BuildJson {
    store: &'static str,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    vectors: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Serialize)]
struct IndexStatusJson {
    store: &'static str,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vectors: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimension: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    indexed_entries: Option<usize>,
    current_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    built_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(status_only: bool, json: bool) -> Result<()> {
    let paths = HomePaths::new();

    if status_only {
        return show_status(&paths, json);
    }

    let config = paths.get_config();
    let embedder = create_embedder(&config.encoder.search_config(&paths.root))
        .context("Failed to load encoder")?;

    if !json {
        println!(
            "{} Building indexes with {}...",
            "→".dimmed(),
            embedder.name().cyan()
        );
    }

    let memory = build_index_file::<MemoryEntry>(
        &paths.memory,
        &paths.memory_index,
        &TextFields::memory(),
        embedder.as_ref(),
    )?;
    let goals = build_index_file::<GoalEntry>(
        &paths.goals,
        &paths.goals_index,
        &TextFields::goals(),
        embedder.as_ref(),
    )?;

    let results = [
        ("memories", memory, &paths.memory, &paths.memory_index),
        ("goals", goals, &paths.goals, &paths.goals_index),
    ];

    if json {
        let output: Vec<BuildJson> = results
            .iter()
            .map(|(store, outcome, _, _)| build_json(*store, outcome))
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    for (store, outcome, store_path, index_path) in &results {
        print_outcome(store, outcome, store_path, index_path);
    }

    Ok(())
}

fn build_json(store: &'static str, outcome: &BuildOutcome) -> BuildJson {
    let mut json = BuildJson {
        store,
        outcome: "built",
        vectors: None,
        duration_ms: None,
        reason: None,
    };
    match outcome {
        BuildOutcome::Built {
            vectors,
            duration_ms,
            ..
        } => {
            json.vectors = Some(*vectors);
            json.duration_ms = Some(*duration_ms);
        }
        BuildOutcome::SkippedMissing => json.outcome = "missing",
        BuildOutcome::SkippedEmpty => json.outcome = "empty",
        BuildOutcome::SkippedMalformed(reason) => {
            json.outcome = "malformed";
            json.reason = Some(reason.clone());
        }
    }
    json
}

fn print_outcome(store: &str, outcome: &BuildOutcome, store_path: &Path, index_path: &Path) {
    match outcome {
        BuildOutcome::Built {
            vectors,
            dimension,
            duration_ms,
        } => {
            println!(
                "{} Indexed {} {} ({} dims) in {:.2}s",
                "✓".green().bold(),
                vectors.to_string().cyan(),
                store,
                dimension,
                *duration_ms as f64 / 1000.0
            );
            println!("  {} Index saved to: {}", "→".dimmed(), index_path.display());
        }
        BuildOutcome::SkippedMissing => println!(
            "{} No {} store at {}, skipped",
            "→".dimmed(),
            store,
            store_path.display()
        ),
        BuildOutcome::SkippedEmpty => {
            println!("{} {} store is empty, skipped", "→".dimmed(), store)
        }
        BuildOutcome::SkippedMalformed(reason) => println!(
            "{} Could not read {} store ({}), skipped",
            "✗".red(),
            store,
            reason
        ),
    }
}

/// Show index status
fn show_status(paths: &HomePaths, json: bool) -> Result<()> {
    let statuses = [
        index_status("memories", &paths.memory_index, store_len::<MemoryEntry>(&paths.memory)),
        index_status("goals", &paths.goals_index, store_len::<GoalEntry>(&paths.goals)),
    ];

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("{}", "Index Status".bold());
    for status in &statuses {
        println!();
        println!("  {}", status.store.bold());
        if let Some(error) = &status.error {
            println!("  {} {}", "✗".red(), error);
            continue;
        }
        if !status.exists {
            println!(
                "  {} Index not found. Run {} first.",
                "!".yellow().bold(),
                "recollect index".cyan()
            );
            continue;
        }
        println!(
            "  {} {} vectors, {} dims ({})",
            "→".dimmed(),
            status.vectors.unwrap_or(0).to_string().cyan(),
            status.dimension.unwrap_or(0),
            status.embedder.as_deref().unwrap_or("unknown")
        );
        let indexed = status.indexed_entries.unwrap_or(0);
        if indexed == status.current_entries {
            println!("  {} Up to date with {} entries", "✓".green(), indexed);
        } else if indexed < status.current_entries {
            println!(
                "  {} {} new entries since the last build",
                "!".yellow().bold(),
                status.current_entries - indexed
            );
        } else {
            println!(
                "  {} Store shrank from {} to {} entries; rebuild required",
                "✗".red(),
                indexed,
                status.current_entries
            );
        }
        if let Some(built_at) = &status.built_at {
            println!("  {} Last indexed: {}", "→".dimmed(), built_at);
        }
    }

    Ok(())
}

fn store_len<T: serde::de::DeserializeOwned>(path: &Path) -> usize {
    match read_json_sequence::<T>(path) {
        StoreRead::Loaded(entries) => entries.len(),
        _ => 0,
    }
}

fn index_status(store: &'static str, index_path: &Path, current_entries: usize) -> IndexStatusJson {
    let mut status = IndexStatusJson {
        store,
        exists: index_path.exists(),
        embedder: None,
        vectors: None,
        dimension: None,
        indexed_entries: None,
        current_entries,
        built_at: None,
        error: None,
    };
    if !status.exists {
        return status;
    }

    match IndexArtifact::load(index_path) {
        Ok(artifact) => {
            status.embedder = Some(artifact.embedder.clone());
            status.vectors = Some(artifact.index.len());
            status.dimension = Some(artifact.index.dimension());
            status.indexed_entries = Some(artifact.source_len);
            status.built_at = chrono::DateTime::from_timestamp(artifact.built_at, 0)
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        Err(e) => status.error = Some(e.to_string()),
    }
    status
}
