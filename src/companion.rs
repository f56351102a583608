//! The companion: retrieval, prompt assembly, generation and memory
//!
//! One [`Companion`] is built at startup from the home directory and reused
//! for every thought. Each [`Companion::respond`] call reads the stores fresh,
//! so memories recorded by earlier calls are visible to later ones.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::entry::{Entry, GoalEntry, MemoryEntry, TextFields};
use crate::core::paths::HomePaths;
use crate::core::store::{Constitution, GoalStore, MemoryStore};
use crate::error::RetrievalError;
use crate::generator::{create_generator, Generator, PreviewGenerator, GENERATION_FAILED_REPLY};
use crate::prompt::{build_prompt, format_context, GOAL_TITLE, MEMORY_TITLE};
use crate::retrieval::{
    select, Corpus, IndexSource, KeywordRetriever, Match, RetrievalMode, Retriever,
    SemanticRetriever,
};
use crate::search::embedder::create_embedder;

/// Which store a recall reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Memories,
    Goals,
}

impl SourceKind {
    /// `memories`/`memory` or `goals`/`goal`, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memories" | "memory" => Some(SourceKind::Memories),
            "goals" | "goal" => Some(SourceKind::Goals),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SourceKind::Memories => MEMORY_TITLE,
            SourceKind::Goals => GOAL_TITLE,
        }
    }

    pub fn fields(&self) -> TextFields {
        match self {
            SourceKind::Memories => TextFields::memory(),
            SourceKind::Goals => TextFields::goals(),
        }
    }
}

/// Outcome of one thought
#[derive(Debug, Clone)]
pub struct Reflection {
    pub reply: String,
    pub prompt: String,
    pub memories: Vec<MemoryEntry>,
    pub goals: Vec<GoalEntry>,
    /// False when the generator failed and the fixed apology was used
    pub generated: bool,
    /// False when the interaction could not be written to the memory store
    pub recorded: bool,
}

/// One recalled entry, rendered as its context line
#[derive(Debug, Clone, Serialize)]
pub struct Recalled {
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    pub text: String,
}

/// Retrieval without generation
#[derive(Debug, Clone, Serialize)]
pub struct Recall {
    pub source: SourceKind,
    pub mode: RetrievalMode,
    pub entries: Vec<Recalled>,
    pub block: String,
}

/// Store locations the companion reads and writes
#[derive(Debug, Clone)]
pub struct CompanionStores {
    pub memory: MemoryStore,
    pub goals: GoalStore,
    pub constitution: PathBuf,
    pub memory_index: IndexSource,
    pub goals_index: IndexSource,
}

impl CompanionStores {
    /// Stores from the home paths; indexes are read when first queried
    pub fn from_home(paths: &HomePaths) -> Self {
        Self {
            memory: MemoryStore::new(&paths.memory),
            goals: GoalStore::new(&paths.goals),
            constitution: paths.constitution.clone(),
            memory_index: IndexSource::location(&paths.memory_index),
            goals_index: IndexSource::location(&paths.goals_index),
        }
    }

    /// Read both index artifacts now; unreadable ones stay as locations
    pub fn preload_indexes(mut self) -> Self {
        self.memory_index = preload(self.memory_index);
        self.goals_index = preload(self.goals_index);
        self
    }
}

fn preload(source: IndexSource) -> IndexSource {
    match source {
        IndexSource::Location(path) => match IndexSource::preload(&path) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load index");
                IndexSource::Location(path)
            }
        },
        loaded => loaded,
    }
}

pub struct Companion {
    stores: CompanionStores,
    retriever: Box<dyn Retriever>,
    fallback: KeywordRetriever,
    generator: Box<dyn Generator>,
    max_results: usize,
}

impl Companion {
    pub fn new(
        stores: CompanionStores,
        retriever: Box<dyn Retriever>,
        generator: Box<dyn Generator>,
        max_results: usize,
    ) -> Self {
        Self {
            stores,
            retriever,
            fallback: KeywordRetriever::new(),
            generator,
            max_results,
        }
    }

    /// Companion configured from the home directory.
    ///
    /// An encoder that fails to load leaves the companion on keyword
    /// retrieval; a generator command that cannot be parsed leaves it on the
    /// prompt preview.
    pub fn from_home(paths: &HomePaths) -> Self {
        let config = paths.get_config();
        let stores = CompanionStores::from_home(paths);
        let mode = config.retrieval.mode;

        let retriever: Box<dyn Retriever> = match mode {
            RetrievalMode::Keyword => Box::new(KeywordRetriever::new()),
            RetrievalMode::Semantic => {
                match create_embedder(&config.encoder.search_config(&paths.root)) {
                    Ok(embedder) => {
                        info!(encoder = embedder.name(), "semantic retrieval enabled");
                        Box::new(
                            SemanticRetriever::new(Arc::from(embedder))
                                .with_threshold(config.retrieval.threshold),
                        )
                    }
                    Err(e) => {
                        warn!(error = %e, "encoder unavailable, using keyword retrieval");
                        Box::new(KeywordRetriever::new())
                    }
                }
            }
        };
        let stores = if retriever.mode() == RetrievalMode::Semantic {
            stores.preload_indexes()
        } else {
            stores
        };

        let generator: Box<dyn Generator> =
            match create_generator(config.generator.command.as_deref()) {
                Ok(generator) => generator,
                Err(e) => {
                    warn!(error = %e, "generator misconfigured, using prompt preview");
                    Box::new(PreviewGenerator)
                }
            };

        Self::new(stores, retriever, generator, config.retrieval.max_results)
    }

    pub fn with_retriever(mut self, retriever: Box<dyn Retriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_generator(mut self, generator: Box<dyn Generator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn mode(&self) -> RetrievalMode {
        self.retriever.mode()
    }

    pub fn stores(&self) -> &CompanionStores {
        &self.stores
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Reflect on a thought and record the exchange.
    ///
    /// Generator failures become [`GENERATION_FAILED_REPLY`]; the exchange
    /// is recorded either way.
    pub fn respond(&self, user_input: &str) -> Reflection {
        let memories = self.stores.memory.load();
        let goals = self.stores.goals.load();
        let constitution = Constitution::load(&self.stores.constitution);

        let memory_fields = TextFields::memory();
        let goal_fields = TextFields::goals();

        let memory_matches = self.retrieve_or_fallback(
            user_input,
            &memories,
            &memory_fields,
            &self.stores.memory_index,
        );
        let goal_matches =
            self.retrieve_or_fallback(user_input, &goals, &goal_fields, &self.stores.goals_index);

        let relevant_memories = select(&memories, &memory_matches);
        let relevant_goals = select(&goals, &goal_matches);
        debug!(
            memories = relevant_memories.len(),
            goals = relevant_goals.len(),
            "context retrieved"
        );

        let memory_block = format_context(&relevant_memories, MEMORY_TITLE, &memory_fields);
        let goal_block = format_context(&relevant_goals, GOAL_TITLE, &goal_fields);
        let prompt = build_prompt(&constitution, &goal_block, &memory_block, user_input);

        let (reply, generated) = match self.generator.generate(&prompt) {
            Ok(reply) => (reply, true),
            Err(e) => {
                warn!(generator = self.generator.name(), error = %e, "generation failed");
                (GENERATION_FAILED_REPLY.to_string(), false)
            }
        };

        let entry = MemoryEntry::new(user_input, &reply, user_input);
        let recorded = match self.stores.memory.append(entry) {
            Ok(()) => true,
            Err(e) => {
                error!(path = %self.stores.memory.path().display(), error = %e, "failed to record interaction");
                false
            }
        };

        Reflection {
            reply,
            prompt,
            memories: relevant_memories.into_iter().cloned().collect(),
            goals: relevant_goals.into_iter().cloned().collect(),
            generated,
            recorded,
        }
    }

    /// Retrieve from one store without generating or recording anything.
    ///
    /// `limit` overrides the configured number of results.
    pub fn recall(
        &self,
        query: &str,
        source: SourceKind,
        limit: Option<usize>,
    ) -> Result<Recall, RetrievalError> {
        let fields = source.fields();
        let max_results = limit.unwrap_or(self.max_results);
        let (entries, block) = match source {
            SourceKind::Memories => {
                let memories = self.stores.memory.load();
                self.recall_from(
                    query,
                    &memories,
                    &fields,
                    &self.stores.memory_index,
                    source,
                    max_results,
                )?
            }
            SourceKind::Goals => {
                let goals = self.stores.goals.load();
                self.recall_from(
                    query,
                    &goals,
                    &fields,
                    &self.stores.goals_index,
                    source,
                    max_results,
                )?
            }
        };

        Ok(Recall {
            source,
            mode: self.retriever.mode(),
            entries,
            block,
        })
    }

    fn recall_from<E: Entry>(
        &self,
        query: &str,
        entries: &[E],
        fields: &TextFields,
        index: &IndexSource,
        source: SourceKind,
        max_results: usize,
    ) -> Result<(Vec<Recalled>, String), RetrievalError> {
        let corpus = Corpus::new(entries, fields).with_index(index);
        let matches = self.retriever.retrieve(query, &corpus, max_results)?;

        let recalled = matches
            .iter()
            .filter_map(|m| {
                entries.get(m.position).map(|entry| Recalled {
                    position: m.position,
                    similarity: m.similarity,
                    text: render_line(entry, fields),
                })
            })
            .collect();
        let block = format_context(&select(entries, &matches), source.title(), fields);
        Ok((recalled, block))
    }

    fn retrieve_or_fallback<E: Entry>(
        &self,
        query: &str,
        entries: &[E],
        fields: &TextFields,
        index: &IndexSource,
    ) -> Vec<Match> {
        let corpus = Corpus::new(entries, fields).with_index(index);
        match self.retriever.retrieve(query, &corpus, self.max_results) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(
                    mode = %self.retriever.mode(),
                    error = %e,
                    "retrieval failed, falling back to keyword matching"
                );
                self.fallback
                    .retrieve(query, &corpus, self.max_results)
                    .unwrap_or_default()
            }
        }
    }
}

fn render_line<E: Entry>(entry: &E, fields: &TextFields) -> String {
    fields
        .names()
        .iter()
        .map(|name| entry.field(name).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(": ")
}
