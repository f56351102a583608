//! Companion home initialization

use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use recollect::core::config::{Config, CONFIG_FILE_NAME};
use recollect::core::entry::{GoalEntry, MemoryEntry};
use recollect::core::paths::{get_home_root, HomePaths};
use recollect::core::store::write_json_sequence;

const CONSTITUTION_TEMPLATE: &str = "\
# Principles that define the companion's persona.
# The whole document is passed to the generator with every thought.
role: A thoughtful companion for reflection and clarity
principles:
  - Listen first and reflect back what you hear
  - Connect the current thought to past reflections and stated goals
  - Ask one open question rather than giving direct advice
tone: warm, curious, concise
";

pub fn run(force: bool) -> Result<()> {
    let root = get_home_root();
    let config_path = root.join(CONFIG_FILE_NAME);

    println!("{}", "Recollect Initialization".bold());
    println!("{}", "=".repeat(50));
    println!();

    let existed = config_path.exists();
    let config = if existed && !force {
        println!("{} Loading existing config...", "→".blue());
        Config::load(&root)
    } else {
        Config::default()
    };
    config.save(&root)?;

    if existed {
        println!("{} Updated {}", "✓".green(), config_path.display());
    } else {
        println!("{} Created {}", "✓".green(), config_path.display());
    }

    let paths = HomePaths::from_root_with_config(root, config);

    create_if_absent(&paths.memory, || {
        write_json_sequence::<MemoryEntry>(&paths.memory, &[])
    })?;
    create_if_absent(&paths.goals, || {
        write_json_sequence::<GoalEntry>(&paths.goals, &[])
    })?;
    create_if_absent(&paths.constitution, || {
        if let Some(parent) = paths.constitution.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&paths.constitution, CONSTITUTION_TEMPLATE)
            .with_context(|| format!("Failed to write {}", paths.constitution.display()))
    })?;

    let config = paths.get_config();
    println!();
    println!("{}", "Configuration:".cyan());
    println!();
    println!("  stores:");
    println!("    memory: \"{}\"", config.stores.memory);
    println!("    goals: \"{}\"", config.stores.goals);
    println!("    constitution: \"{}\"", config.stores.constitution);
    println!();
    println!("  retrieval:");
    println!("    mode: {}", config.retrieval.mode);
    println!("    maxResults: {}", config.retrieval.max_results);
    println!("    threshold: {}", config.retrieval.threshold);
    println!();
    println!(
        "{}",
        format!(
            "Edit {} to switch retrieval mode or configure a generator command.",
            CONFIG_FILE_NAME
        )
        .dimmed()
    );
    println!();

    Ok(())
}

fn create_if_absent<F>(path: &Path, create: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    if path.exists() {
        println!("{} Already exists: {}", "→".blue(), path.display());
    } else {
        create()?;
        println!("{} Created {}", "✓".green(), path.display());
    }
    Ok(())
}
