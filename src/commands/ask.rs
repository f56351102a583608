//! Ask command - reflect on one thought

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use recollect::core::paths::HomePaths;
use recollect::Companion;

#[derive(Serialize)]
struct AskJson<'a> {
    reply: &'a str,
    generated: bool,
    recorded: bool,
    memories: usize,
    goals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
}

pub fn run(text: &str, show_prompt: bool, json: bool) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("Nothing to reflect on: the thought is empty");
    }

    let paths = HomePaths::new();
    let companion = Companion::from_home(&paths);
    let reflection = companion.respond(text);

    if json {
        let output = AskJson {
            reply: &reflection.reply,
            generated: reflection.generated,
            recorded: reflection.recorded,
            memories: reflection.memories.len(),
            goals: reflection.goals.len(),
            prompt: show_prompt.then_some(reflection.prompt.as_str()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if show_prompt {
        println!("{}", "Prompt".bold());
        println!("{}", "=".repeat(50));
        println!("{}", reflection.prompt.dimmed());
        println!();
    }

    println!("{}", reflection.reply);
    println!();

    let context = format!(
        "{} memories, {} goals recalled ({} mode)",
        reflection.memories.len(),
        reflection.goals.len(),
        companion.mode()
    );
    println!("{} {}", "→".dimmed(), context.dimmed());

    if !reflection.generated {
        println!("{} Generator failed; see logs ({}=warn)", "!".yellow().bold(), "RECOLLECT_LOG".cyan());
    }
    if !reflection.recorded {
        println!(
            "{} Could not record to {}",
            "✗".red(),
            paths.memory.display()
        );
    }

    Ok(())
}
