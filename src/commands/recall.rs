//! Recall command - retrieval without generation

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

use recollect::core::paths::HomePaths;
use recollect::retrieval::{KeywordRetriever, RetrievalMode, Retriever, SemanticRetriever};
use recollect::search::create_embedder;
use recollect::{Companion, SourceKind};

pub struct RecallOptions {
    pub goals: bool,
    pub semantic: bool,
    pub keyword: bool,
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
}

pub fn run(query: &str, options: RecallOptions, json: bool) -> Result<()> {
    let paths = HomePaths::new();
    let config = paths.get_config();

    let mode = if options.semantic {
        RetrievalMode::Semantic
    } else if options.keyword {
        RetrievalMode::Keyword
    } else {
        config.retrieval.mode
    };

    let retriever: Box<dyn Retriever> = match mode {
        RetrievalMode::Keyword => Box::new(KeywordRetriever::new()),
        RetrievalMode::Semantic => {
            let embedder = create_embedder(&config.encoder.search_config(&paths.root))
                .context("Failed to load encoder for semantic recall")?;
            let threshold = options.threshold.unwrap_or(config.retrieval.threshold);
            Box::new(SemanticRetriever::new(Arc::from(embedder)).with_threshold(threshold))
        }
    };

    let source = if options.goals {
        SourceKind::Goals
    } else {
        SourceKind::Memories
    };

    let companion = Companion::from_home(&paths).with_retriever(retriever);
    let recall = companion
        .recall(query, source, options.limit)
        .with_context(|| format!("Failed to recall {}", source.title().to_lowercase()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recall)?);
        return Ok(());
    }

    if recall.entries.is_empty() {
        println!(
            "{} No relevant {} found ({} mode)",
            "!".yellow().bold(),
            source.title().to_lowercase(),
            recall.mode
        );
        if mode == RetrievalMode::Semantic {
            let index = match source {
                SourceKind::Memories => &paths.memory_index,
                SourceKind::Goals => &paths.goals_index,
            };
            if !index.exists() {
                println!(
                    "  {} Index not found. Run {} first.",
                    "→".dimmed(),
                    "recollect index".cyan()
                );
            }
        }
        return Ok(());
    }

    println!(
        "{} {} relevant {} ({} mode)",
        "✓".green().bold(),
        recall.entries.len().to_string().cyan(),
        source.title().to_lowercase(),
        recall.mode
    );
    println!();
    for entry in &recall.entries {
        match entry.similarity {
            Some(score) => println!(
                "  {} [{}] {}",
                format!("{:.3}", score).green(),
                entry.position,
                entry.text
            ),
            None => println!("  {} [{}] {}", "→".dimmed(), entry.position, entry.text),
        }
    }
    println!();
    print!("{}", recall.block.dimmed());

    Ok(())
}
