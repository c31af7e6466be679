use anyhow::{Context, Result};
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config;

const EXPANSIONS_FILE: &str = "expansions.txt";
const LAST_EDIT_FILE: &str = "last_edit_response.md";

const STDIN_HEADER: &str = "Here is some input from stdin. This might be file contents, error messages, or other command output that the user wanted to include with their query:\n";

/// Piped stdin with an explanatory header, or empty when stdin is a terminal.
pub fn read_stdin() -> Result<String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }

    let mut data = String::new();
    stdin
        .read_to_string(&mut data)
        .context("error reading from stdin")?;
    if data.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{}{}", STDIN_HEADER, data))
}

/// Combines piped input and the user's words into a single query.
pub fn compose_query(stdin: &str, message: &str, label: &str) -> String {
    match (stdin.is_empty(), message.is_empty()) {
        (false, false) => format!(
            "{}\nThat concludes the stdin contents. Now here's the {} from the user:\n{}",
            stdin, label, message
        ),
        (false, true) => stdin.to_string(),
        _ => message.to_string(),
    }
}

/// `~/.local/share/pal_helper/expansions.txt` on Linux,
/// `~/Library/Application Support/pal_helper/expansions.txt` on macOS.
pub fn expansions_path() -> Result<PathBuf> {
    let dir = dirs::data_dir().context("failed to find the data directory")?;
    Ok(dir.join("pal_helper").join(EXPANSIONS_FILE))
}

pub fn last_edit_path() -> Result<PathBuf> {
    Ok(config::base_dir()?.join(LAST_EDIT_FILE))
}

pub fn stored_commands() -> Result<String> {
    stored_commands_at(&expansions_path()?)
}

pub fn store_commands(commands: &str) -> Result<()> {
    store_commands_at(&expansions_path()?, commands)
}

// The first line is reserved for the `<prefix>0` expansion, suggestions
// follow from the second line.
pub fn stored_commands_at(path: &Path) -> Result<String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()))
        }
    };
    Ok(content
        .split_once('\n')
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_default())
}

pub fn store_commands_at(path: &Path, commands: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create storage directory {}", dir.display()))?;
    }

    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()))
        }
    };
    let reserved = existing.split('\n').next().unwrap_or_default();

    fs::write(path, format!("{}\n{}", reserved, commands))
        .with_context(|| format!("failed to write commands to {}", path.display()))?;
    debug!("stored suggestions in {}", path.display());
    Ok(())
}
