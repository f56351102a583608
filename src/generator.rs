//! Text generators the companion hands its prompt to

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Reply recorded when the generator fails
pub const GENERATION_FAILED_REPLY: &str =
    "I'm sorry, I wasn't able to reflect on that just now. Your thought has still been saved to memory.";

/// Produces a reply for a fully assembled prompt
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// Echoes the prompt back inside a mock reply, for trying the companion
/// without a model
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewGenerator;

impl Generator for PreviewGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        Ok(format!(
            "*(This is a mock response. The full prompt that would be sent to the LLM is shown below for testing purposes.)*\n\n\
             --- START OF PROMPT ---\n\
             {}--- END OF PROMPT ---",
            prompt
        ))
    }

    fn name(&self) -> &str {
        "preview"
    }
}

/// Runs an external program with the prompt on stdin; its stdout is the reply
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// From an argv list such as `["llm", "-m", "mistral"]`
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        match argv.split_first() {
            Some((program, args)) if !program.trim().is_empty() => {
                Ok(Self::new(program.clone(), args.to_vec()))
            }
            _ => bail!("Generator command is empty"),
        }
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(program = %self.program, "running generator command");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start generator: {}", self.program))?;

        // Feed stdin from a separate thread so a chatty child cannot block on a full stdout pipe.
        let mut stdin = child.stdin.take().context("Generator stdin unavailable")?;
        let input = prompt.to_string();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for generator: {}", self.program))?;

        match writer.join() {
            Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                return Err(e).context("Failed to write prompt to generator");
            }
            Ok(_) => {}
            Err(_) => bail!("Generator input thread panicked"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "Generator exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        let reply = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if reply.is_empty() {
            bail!("Generator produced no output");
        }
        Ok(reply)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Generator for an optional configured command
pub fn create_generator(command: Option<&[String]>) -> Result<Box<dyn Generator>> {
    match command {
        Some(argv) => Ok(Box::new(CommandGenerator::from_argv(argv)?)),
        None => Ok(Box::new(PreviewGenerator)),
    }
}
