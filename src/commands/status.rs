use anyhow::Result;
use chrono::Local;
use colored::*;
use serde::Serialize;
use std::path::Path;

use recollect::core::config::CONFIG_FILE_NAME;
use recollect::core::paths::HomePaths;
use recollect::core::store::{Constitution, GoalStore, MemoryStore, StoreRead};
use recollect::retrieval::RetrievalMode;
use recollect::search::IndexArtifact;

#[derive(Serialize)]
struct CompanionStatus {
    timestamp: String,
    home: String,
    config_file: bool,
    mode: RetrievalMode,
    max_results: usize,
    threshold: f32,
    memories: StoreStatus,
    goals: StoreStatus,
    constitution: bool,
    warnings: Vec<Warning>,
}

#[derive(Serialize)]
struct StoreStatus {
    state: &'static str,
    entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    indexed_entries: Option<usize>,
}

#[derive(Serialize)]
struct Warning {
    target: String,
    warning_type: String,
    message: String,
}

pub fn run(json: bool) -> Result<()> {
    let paths = HomePaths::new();
    let config = paths.get_config();
    let mut warnings = Vec::new();

    let memories = store_status(
        MemoryStore::new(&paths.memory).read(),
        &paths.memory_index,
    );
    let goals = store_status(GoalStore::new(&paths.goals).read(), &paths.goals_index);

    for (name, status, store_path) in [
        ("memories", &memories, &paths.memory),
        ("goals", &goals, &paths.goals),
    ] {
        if status.state == "malformed" {
            warnings.push(Warning {
                target: store_path.display().to_string(),
                warning_type: "malformed_store".to_string(),
                message: format!("{} store could not be decoded and is treated as empty", name),
            });
        }
        if config.retrieval.mode == RetrievalMode::Semantic {
            match status.indexed_entries {
                None if status.entries > 0 => warnings.push(Warning {
                    target: name.to_string(),
                    warning_type: "missing_index".to_string(),
                    message: "semantic mode is configured but no index exists".to_string(),
                }),
                Some(indexed) if indexed > status.entries => warnings.push(Warning {
                    target: name.to_string(),
                    warning_type: "index_out_of_sync".to_string(),
                    message: format!(
                        "index covers {} entries but the store has {}",
                        indexed, status.entries
                    ),
                }),
                Some(indexed) if indexed < status.entries => warnings.push(Warning {
                    target: name.to_string(),
                    warning_type: "stale_index".to_string(),
                    message: format!("{} entries not indexed yet", status.entries - indexed),
                }),
                _ => {}
            }
        }
    }

    let constitution = !Constitution::load(&paths.constitution).is_empty();
    if !constitution {
        warnings.push(Warning {
            target: paths.constitution.display().to_string(),
            warning_type: "empty_constitution".to_string(),
            message: "no persona principles defined".to_string(),
        });
    }

    let status = CompanionStatus {
        timestamp: Local::now().to_rfc3339(),
        home: paths.root.display().to_string(),
        config_file: paths.root.join(CONFIG_FILE_NAME).exists(),
        mode: config.retrieval.mode,
        max_results: config.retrieval.max_results,
        threshold: config.retrieval.threshold,
        memories,
        goals,
        constitution,
        warnings,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }

    Ok(())
}

fn store_status<T>(read: StoreRead<Vec<T>>, index_path: &Path) -> StoreStatus {
    let (state, entries) = match read {
        StoreRead::Loaded(entries) => ("ok", entries.len()),
        StoreRead::Missing => ("missing", 0),
        StoreRead::Malformed(_) => ("malformed", 0),
    };
    let indexed_entries = if index_path.exists() {
        IndexArtifact::load(index_path).ok().map(|a| a.source_len)
    } else {
        None
    };
    StoreStatus {
        state,
        entries,
        indexed_entries,
    }
}

fn print_status(status: &CompanionStatus) {
    println!("{}", "Companion Status".bold());
    println!("{}", "=".repeat(50));
    println!();
    println!("  {} {}", "Home:".dimmed(), status.home);
    if !status.config_file {
        println!(
            "  {} No {} found, using defaults",
            "→".dimmed(),
            CONFIG_FILE_NAME
        );
    }
    println!(
        "  {} {} (maxResults {}, threshold {})",
        "Mode:".dimmed(),
        status.mode.to_string().cyan(),
        status.max_results,
        status.threshold
    );
    println!();

    for (name, store) in [("Memories", &status.memories), ("Goals", &status.goals)] {
        let index = match store.indexed_entries {
            Some(n) => format!("indexed {}", n),
            None => "no index".to_string(),
        };
        let state = match store.state {
            "ok" => store.entries.to_string().cyan(),
            other => other.yellow(),
        };
        println!("  {:<10} {} ({})", name, state, index.dimmed());
    }
    println!(
        "  {:<10} {}",
        "Persona",
        if status.constitution {
            "defined".green()
        } else {
            "empty".yellow()
        }
    );

    if !status.warnings.is_empty() {
        println!();
        println!("{}", "Warnings".yellow().bold());
        for w in &status.warnings {
            println!("  {} [{}] {}", "!".yellow(), w.warning_type, w.message);
        }
    }
}
