//! Companion round trips against a temporary home directory

use anyhow::Result;
use recollect::core::config::Config;
use recollect::core::entry::{GoalEntry, MemoryEntry, TextFields};
use recollect::core::paths::HomePaths;
use recollect::core::store::{write_json_sequence, MemoryStore};
use recollect::generator::{Generator, GENERATION_FAILED_REPLY};
use recollect::retrieval::RetrievalMode;
use recollect::search::{build_index_file, HtpEmbedder};
use recollect::{Companion, SourceKind};
use tempfile::TempDir;

struct Unavailable;

impl Generator for Unavailable {
    fn generate(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("connection refused")
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

fn home(config: Config) -> (TempDir, HomePaths) {
    let dir = TempDir::new().unwrap();
    config.save(dir.path()).unwrap();
    let paths = HomePaths::from_root(dir.path().to_path_buf());

    write_json_sequence(
        &paths.memory,
        &[
            MemoryEntry::from_summary("Felt grateful for family support"),
            MemoryEntry::from_summary("Thinking about an art project"),
            MemoryEntry::from_summary("Reflecting on the art project and fear of failure"),
        ],
    )
    .unwrap();
    write_json_sequence(
        &paths.goals,
        &[GoalEntry::new("Finish the art project", "Exhibit three pieces by June.")],
    )
    .unwrap();
    std::fs::create_dir_all(paths.constitution.parent().unwrap()).unwrap();
    std::fs::write(&paths.constitution, "tone: gentle\n").unwrap();

    (dir, paths)
}

#[test]
fn reflection_prompt_contains_goals_then_memories() {
    let mut config = Config::default();
    config.retrieval.max_results = 1;
    let (_dir, paths) = home(config);

    let reflection = Companion::from_home(&paths).respond("Tell me about the art project");
    let prompt = &reflection.prompt;

    assert!(prompt.starts_with(
        "Your persona is defined by these principles: {\n  \"tone\": \"gentle\"\n}\n\n"
    ));
    let goals_at = prompt.find("--- Relevant Goals ---").unwrap();
    let memories_at = prompt.find("--- Relevant Memories ---").unwrap();
    assert!(goals_at < memories_at);
    assert!(prompt.contains("- Finish the art project: Exhibit three pieces by June.\n"));
    assert!(prompt.contains("- Reflecting on the art project and fear of failure\n"));
    assert!(!prompt.contains("- Thinking about an art project\n"));
    assert!(prompt.ends_with("User's current thought: Tell me about the art project\n\nAI Companion's reflection:"));
}

#[test]
fn failed_generation_is_recorded_as_history() {
    let (_dir, paths) = home(Config::default());
    let companion = Companion::from_home(&paths).with_generator(Box::new(Unavailable));

    let reflection = companion.respond("Worried about the art project");
    assert_eq!(reflection.reply, GENERATION_FAILED_REPLY);
    assert!(reflection.recorded);

    let log = MemoryStore::new(&paths.memory).load();
    assert_eq!(log.len(), 4);
    assert_eq!(log[3].user_input, "Worried about the art project");
    assert_eq!(log[3].assistant_reply, GENERATION_FAILED_REPLY);
}

#[test]
fn semantic_mode_uses_prebuilt_index() {
    let mut config = Config::default();
    config.retrieval.mode = RetrievalMode::Semantic;
    config.retrieval.threshold = 0.6;
    let (_dir, paths) = home(config);

    build_index_file::<MemoryEntry>(
        &paths.memory,
        &paths.memory_index,
        &TextFields::memory(),
        &HtpEmbedder::new(),
    )
    .unwrap();

    let companion = Companion::from_home(&paths);
    assert_eq!(companion.mode(), RetrievalMode::Semantic);

    let recall = companion
        .recall("Thinking about an art project", SourceKind::Memories, Some(1))
        .unwrap();
    assert_eq!(recall.entries.len(), 1);
    assert_eq!(recall.entries[0].position, 1);
    assert!(recall.entries[0].similarity.unwrap() > 0.99);

    let unrelated = companion
        .recall("Boiling water for cooking pasta tonight", SourceKind::Memories, None)
        .unwrap();
    assert!(unrelated.entries.is_empty());
    assert_eq!(unrelated.block, "");

    // Goals have no index yet, so semantic recall finds nothing there
    let goals = companion
        .recall("Finish the art project", SourceKind::Goals, None)
        .unwrap();
    assert!(goals.entries.is_empty());
}

#[test]
fn shrunken_store_is_reported_out_of_sync() {
    let mut config = Config::default();
    config.retrieval.mode = RetrievalMode::Semantic;
    let (_dir, paths) = home(config);

    build_index_file::<MemoryEntry>(
        &paths.memory,
        &paths.memory_index,
        &TextFields::memory(),
        &HtpEmbedder::new(),
    )
    .unwrap();
    write_json_sequence(&paths.memory, &[MemoryEntry::from_summary("Only one left")]).unwrap();

    let companion = Companion::from_home(&paths);
    let result = companion.recall("Only one left", SourceKind::Memories, None);
    assert!(matches!(
        result,
        Err(recollect::RetrievalError::OutOfSync { indexed: 3, available: 1 })
    ));

    // Reflection degrades to keyword matching instead of failing
    let reflection = companion.respond("Only one left");
    assert_eq!(reflection.memories.len(), 1);
    assert!(reflection.recorded);
}

#[test]
fn unloadable_encoder_falls_back_to_keywords() {
    let mut config = Config::default();
    config.retrieval.mode = RetrievalMode::Semantic;
    config.encoder.use_advanced = true;
    config.encoder.model_path = Some("models/empty".to_string());
    let (_dir, paths) = home(config);
    std::fs::create_dir_all(paths.root.join("models/empty")).unwrap();

    let companion = Companion::from_home(&paths);
    assert_eq!(companion.mode(), RetrievalMode::Keyword);

    let reflection = companion.respond("Still thinking about the art project");
    let memories: Vec<&str> = reflection
        .memories
        .iter()
        .map(|m| m.summary.as_str())
        .collect();
    assert_eq!(
        memories,
        vec![
            "Thinking about an art project",
            "Reflecting on the art project and fear of failure"
        ]
    );
    assert_eq!(reflection.goals.len(), 1);
    assert!(reflection.recorded);
    assert_eq!(MemoryStore::new(&paths.memory).load().len(), 4);
}
