mod commands;

use clap::{Parser, Subcommand};

/// Environment variable holding the log filter
const LOG_ENV: &str = "RECOLLECT_LOG";

#[derive(Parser)]
#[command(name = "recollect")]
#[command(about = "Reflective AI companion with keyword and semantic recall over a personal memory log", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    // ===== MCP Server (also default) =====
    /// Start MCP server
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show MCP client configuration instructions")]
        install: bool,
    },

    // ===== Core Commands =====
    /// Create config, stores and a constitution template
    Init {
        #[arg(long, help = "Overwrite an existing config with defaults")]
        force: bool,
    },
    /// Reflect on a thought and record it
    Ask {
        /// The thought to reflect on
        text: String,
        #[arg(long, help = "Print the assembled prompt as well")]
        show_prompt: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Retrieve relevant memories or goals without recording anything
    Recall {
        query: String,
        #[arg(long, short, help = "Search goals instead of memories")]
        goals: bool,
        #[arg(long, short, help = "Use semantic retrieval", conflicts_with = "keyword")]
        semantic: bool,
        #[arg(long, short, help = "Use keyword retrieval")]
        keyword: bool,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, short, help = "Minimum similarity (semantic mode)")]
        threshold: Option<f32>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show store counts, index state and warnings
    Status {
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== Semantic Recall =====
    /// Build vector indexes for memories and goals
    Index {
        #[arg(long, help = "Show index status only")]
        status: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        // Default: run MCP server
        None => {
            #[cfg(feature = "mcp")]
            {
                run_mcp_server()
            }
            #[cfg(not(feature = "mcp"))]
            {
                eprintln!("MCP feature not enabled. Build with --features mcp");
                std::process::exit(1);
            }
        }

        // MCP Server
        #[cfg(feature = "mcp")]
        Some(Commands::Mcp { install }) => {
            if install {
                print_mcp_install_instructions();
                Ok(())
            } else {
                run_mcp_server()
            }
        }

        // Core commands
        Some(Commands::Init { force }) => commands::init::run(force),
        Some(Commands::Ask {
            text,
            show_prompt,
            json,
        }) => commands::ask::run(&text, show_prompt, json),
        Some(Commands::Recall {
            query,
            goals,
            semantic,
            keyword,
            limit,
            threshold,
            json,
        }) => commands::recall::run(
            &query,
            commands::recall::RecallOptions {
                goals,
                semantic,
                keyword,
                limit,
                threshold,
            },
            json,
        ),
        Some(Commands::Status { json }) => commands::status::run(json),

        // Semantic Recall
        Some(Commands::Index { status, json }) => commands::index::run(status, json),
    }
}

/// Logs go to stderr; stdout carries command output and the MCP transport
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "mcp")]
fn run_mcp_server() -> anyhow::Result<()> {
    let home = recollect::core::paths::get_home_root();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(recollect::mcp::run_mcp_server(home))
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions() {
    use colored::Colorize;
    use recollect::core::paths::HOME_PATH_ENV;

    let home = recollect::core::paths::get_home_root()
        .to_string_lossy()
        .to_string();

    println!("{}", "Recollect MCP Server Installation Guide".bold().cyan());
    println!();
    println!("{}", "Configuration Priority:".bold());
    println!(
        "  1. {} environment variable (recommended)",
        HOME_PATH_ENV.yellow()
    );
    println!("  2. Current working directory (fallback)");
    println!();
    println!("{}", "MCP client configuration (mcpServers entry):".dimmed());
    println!(
        r#"{{
  "mcpServers": {{
    "recollect": {{
      "command": "recollect",
      "args": ["mcp"],
      "env": {{
        "{}": "{}"
      }}
    }}
  }}
}}"#,
        HOME_PATH_ENV, home
    );
    println!();
    println!("{}", "Available tools:".bold());
    println!(
        "  • {} - Reflect on a thought and record it",
        "companion_reflect".green()
    );
    println!(
        "  • {} - Retrieve relevant memories or goals",
        "companion_recall".green()
    );
    println!(
        "  • {} - Store counts and retrieval mode",
        "companion_status".green()
    );
}
