//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.hearth/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::character::Persona;
use crate::inference::ReplyMode;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HearthConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub chats: ChatsConfig,
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    #[serde(default)]
    pub lmstudio: LmStudioConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub max_output_tokens: Option<u32>,
    pub reply_mode: Option<ReplyMode>,
    /// Character card loaded when `--character` is not given.
    pub character: Option<String>,
    pub system_prompt: Option<String>,
    pub system_prompt_file: Option<String>,
    pub bell: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PersonaConfig {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RenderConfig {
    pub resolve_overlaps: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SafetyConfig {
    #[serde(default)]
    pub blocked_terms: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChatsConfig {
    pub save_debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LmStudioConfig {
    pub base_url: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_MODEL: &str = "mistralai/mistral-nemo";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 800;
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub provider: String,
    pub model_name: String,
    pub max_output_tokens: u32,
    pub mode: ReplyMode,
    pub character_path: Option<PathBuf>,
    pub persona: Persona,
    /// Extra instructions appended to every system directive.
    pub system_prompt: Option<String>,
    pub bell: bool,
    pub resolve_overlaps: bool,
    pub blocked_terms: Vec<String>,
    pub save_debounce: Duration,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub lmstudio_base_url: String,
}

/// Values given on the command line (None = not specified).
#[derive(Debug, Default, Clone, Copy)]
pub struct CliOverrides<'a> {
    pub provider: Option<&'a str>,
    pub character: Option<&'a Path>,
    pub persona: Option<&'a str>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.hearth/`.
pub fn hearth_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".hearth"))
}

/// Returns the path to `~/.hearth/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    hearth_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.hearth/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `HearthConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<HearthConfig, ConfigError> {
    let Some(path) = config_path() else {
        warn!("Could not determine home directory, using default config");
        return Ok(HearthConfig::default());
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(HearthConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config = parse_config(&contents)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<HearthConfig, ConfigError> {
    toml::from_str(contents).map_err(ConfigError::Parse)
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Hearth Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# default_provider = "openrouter"    # "openrouter" or "lmstudio"
# default_model = "mistralai/mistral-nemo"
# max_output_tokens = 1024
# reply_mode = "roleplay"            # "casual", "roleplay", "story"
# character = "cards/luna.toml"      # Path relative to ~/.hearth/
# system_prompt = "Keep replies under 120 words."
# system_prompt_file = "rules.md"    # Path relative to ~/.hearth/
# bell = true                        # Ring the terminal bell on replies

# [persona]
# name = "Sam"
# description = "A night owl who loves mysteries."

# [render]
# resolve_overlaps = false           # Drop matches nested inside other matches

# [safety]
# blocked_terms = ["spoilers"]

# [chats]
# save_debounce_ms = 800

# [openrouter]
# api_key = "sk-or-..."              # Or set OPENROUTER_API_KEY env var
# base_url = "https://openrouter.ai/api/v1"

# [lmstudio]
# base_url = "http://localhost:1234/v1"
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_TEMPLATE) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &HearthConfig, cli: CliOverrides<'_>) -> ResolvedConfig {
    // Provider: CLI → env → config → default
    let provider = cli
        .provider
        .map(|s| s.to_string())
        .or_else(|| std::env::var("HEARTH_PROVIDER").ok())
        .or_else(|| config.general.default_provider.clone())
        .unwrap_or_else(|| "openrouter".to_string());

    // Model: env → config → default
    let model_name = std::env::var("HEARTH_MODEL")
        .ok()
        .or_else(|| config.general.default_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    // Character card: CLI → config (relative to ~/.hearth/)
    let character_path = cli.character.map(Path::to_path_buf).or_else(|| {
        config
            .general
            .character
            .as_deref()
            .map(|p| resolve_relative(Path::new(p)))
    });

    let mut persona = Persona::default();
    if let Some(name) = cli
        .persona
        .or(config.persona.name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        persona.name = name.to_string();
    }
    if let Some(description) = &config.persona.description {
        persona.description = description.clone();
    }

    // OpenRouter API key: env → config
    let openrouter_api_key = std::env::var("OPENROUTER_API_KEY")
        .ok()
        .or_else(|| config.openrouter.api_key.clone());

    // OpenRouter base URL: env → config → default
    let openrouter_base_url = std::env::var("OPENROUTER_BASE_URL")
        .ok()
        .or_else(|| config.openrouter.base_url.clone())
        .unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string());

    // LM Studio base URL: env → config → default
    let lmstudio_base_url = std::env::var("LM_STUDIO_BASE_URL")
        .ok()
        .or_else(|| config.lmstudio.base_url.clone())
        .unwrap_or_else(|| DEFAULT_LMSTUDIO_BASE_URL.to_string());

    ResolvedConfig {
        provider,
        model_name,
        max_output_tokens: config
            .general
            .max_output_tokens
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
        mode: config.general.reply_mode.unwrap_or_default(),
        character_path,
        persona,
        system_prompt: resolve_system_prompt(config),
        bell: config.general.bell.unwrap_or(true),
        resolve_overlaps: config.render.resolve_overlaps.unwrap_or(false),
        blocked_terms: config.safety.blocked_terms.clone(),
        save_debounce: Duration::from_millis(
            config
                .chats
                .save_debounce_ms
                .unwrap_or(DEFAULT_SAVE_DEBOUNCE_MS),
        ),
        openrouter_api_key,
        openrouter_base_url,
        lmstudio_base_url,
    }
}

/// Relative paths in the config file are anchored at `~/.hearth/`.
fn resolve_relative(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match hearth_dir() {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}

/// Inline prompt wins over the file; None when neither yields text.
fn resolve_system_prompt(config: &HearthConfig) -> Option<String> {
    if let Some(prompt) = config.general.system_prompt.as_deref().map(str::trim)
        && !prompt.is_empty()
    {
        return Some(prompt.to_string());
    }

    let file = config.general.system_prompt_file.as_deref()?;
    let prompt_path = resolve_relative(Path::new(file));
    match fs::read_to_string(&prompt_path) {
        Ok(contents) => {
            let trimmed = contents.trim();
            if trimmed.is_empty() {
                warn!("System prompt file is empty: {}", prompt_path.display());
                None
            } else {
                info!("Loaded system prompt from {}", prompt_path.display());
                Some(trimmed.to_string())
            }
        }
        Err(e) => {
            warn!(
                "Failed to read system prompt file {}: {}",
                prompt_path.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses_as_empty_config() {
        let config = parse_config(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert!(config.general.default_provider.is_none());
        assert!(config.safety.blocked_terms.is_empty());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let config = HearthConfig::default();
        let resolved = resolve(&config, CliOverrides::default());
        assert_eq!(resolved.max_output_tokens, DEFAULT_MAX_OUTPUT_TOKENS);
        assert_eq!(resolved.mode, ReplyMode::default());
        assert_eq!(resolved.persona.name, "You");
        assert!(!resolved.resolve_overlaps);
        assert!(resolved.bell);
        assert_eq!(
            resolved.save_debounce,
            Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS)
        );
        assert!(resolved.system_prompt.is_none());
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = parse_config(
            r#"
[general]
default_provider = "lmstudio"
default_model = "my-model"
max_output_tokens = 300
reply_mode = "story"
system_prompt = "  Stay in character.  "
bell = false

[persona]
name = "Sam"
description = "A night owl."

[render]
resolve_overlaps = true

[safety]
blocked_terms = ["spoilers"]

[chats]
save_debounce_ms = 50
"#,
        )
        .unwrap();
        let resolved = resolve(&config, CliOverrides::default());
        assert_eq!(resolved.provider, "lmstudio");
        assert_eq!(resolved.max_output_tokens, 300);
        assert_eq!(resolved.mode, ReplyMode::Story);
        assert_eq!(resolved.persona.name, "Sam");
        assert_eq!(resolved.persona.description, "A night owl.");
        assert_eq!(resolved.system_prompt.as_deref(), Some("Stay in character."));
        assert!(!resolved.bell);
        assert!(resolved.resolve_overlaps);
        assert_eq!(resolved.blocked_terms, ["spoilers"]);
        assert_eq!(resolved.save_debounce, Duration::from_millis(50));
    }

    #[test]
    fn test_resolve_cli_wins() {
        let config = parse_config(
            r#"
[general]
default_provider = "lmstudio"
character = "/cards/vex.json"

[persona]
name = "Sam"
"#,
        )
        .unwrap();
        let cli = CliOverrides {
            provider: Some("openrouter"),
            character: Some(Path::new("luna.toml")),
            persona: Some("Alex"),
        };
        let resolved = resolve(&config, cli);
        assert_eq!(resolved.provider, "openrouter");
        assert_eq!(resolved.character_path, Some(PathBuf::from("luna.toml")));
        assert_eq!(resolved.persona.name, "Alex");
    }

    #[test]
    fn test_absolute_character_path_is_kept() {
        let config = parse_config("[general]\ncharacter = \"/cards/vex.json\"\n").unwrap();
        let resolved = resolve(&config, CliOverrides::default());
        assert_eq!(resolved.character_path, Some(PathBuf::from("/cards/vex.json")));
    }

    #[test]
    fn test_blank_persona_name_falls_back() {
        let config = parse_config("[persona]\nname = \"   \"\n").unwrap();
        let resolved = resolve(&config, CliOverrides::default());
        assert_eq!(resolved.persona.name, "You");
    }

    #[test]
    fn test_malformed_config_is_a_parse_error() {
        let err = parse_config("[general]\nmax_output_tokens = \"lots\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
