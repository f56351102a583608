//! Prompt assembly
//!
//! Retrieved entries are rendered into delimited context blocks which are
//! concatenated with the persona principles and the user's thought.

use crate::core::entry::{Entry, TextFields};
use crate::core::store::Constitution;

pub const MEMORY_TITLE: &str = "Memories";
pub const GOAL_TITLE: &str = "Goals";

const BLOCK_FOOTER: &str = "-------------------------";

/// Render entries as a titled block, or `""` when there are none.
///
/// A single field renders as `- {value}`; several render as
/// `- {first}: {second}` and any further fields are left out.
pub fn format_context<E: Entry + ?Sized>(entries: &[&E], title: &str, fields: &TextFields) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let names = fields.names();
    let lines: Vec<String> = entries
        .iter()
        .map(|entry| match names.as_slice() {
            [] => "- ".to_string(),
            [only] => format!("- {}", entry.field(only).unwrap_or("")),
            [first, second, ..] => format!(
                "- {}: {}",
                entry.field(first).unwrap_or(""),
                entry.field(second).unwrap_or("")
            ),
        })
        .collect();

    format!(
        "--- Relevant {} ---\n{}\n{}\n\n",
        title,
        lines.join("\n"),
        BLOCK_FOOTER
    )
}

/// Full prompt for the generator
pub fn build_prompt(
    constitution: &Constitution,
    goal_block: &str,
    memory_block: &str,
    user_input: &str,
) -> String {
    format!(
        "Your persona is defined by these principles: {}\n\n{}{}User's current thought: {}\n\nAI Companion's reflection:",
        constitution.to_prompt_json(),
        goal_block,
        memory_block,
        user_input
    )
}
