use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use hearth::core::character::{Character, load_character};
use hearth::core::config::{CliOverrides, load_config, resolve};
use hearth::tui;
use log::{info, warn};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "hearth", about = "Chat with AI characters in your terminal")]
struct Args {
    /// LLM provider to use (openrouter or lmstudio)
    #[arg(short, long)]
    provider: Option<String>,

    /// Character card to chat with (.json or .toml)
    #[arg(short, long)]
    character: Option<PathBuf>,

    /// Name you appear as in the chat
    #[arg(long)]
    persona: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to hearth.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("hearth.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let config = load_config().map_err(std::io::Error::other)?;
    let config = resolve(
        &config,
        CliOverrides {
            provider: args.provider.as_deref(),
            character: args.character.as_deref(),
            persona: args.persona.as_deref(),
        },
    );

    let character = match &config.character_path {
        Some(path) => load_character(path).unwrap_or_else(|e| {
            warn!("Failed to load character {}: {e}; using the default companion", path.display());
            Character::companion()
        }),
        None => Character::companion(),
    };

    info!(
        "Hearth starting up: provider {}, character {}, persona {}",
        config.provider, character.name, config.persona.name
    );

    tui::run(config, character)
}
