use anyhow::{bail, Context, Result};
use tracing::warn;

use super::{client_for, Invocation};
use crate::abbr;
use crate::storage;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that suggests shell commands. Each command is a single line that can run in the shell. Respond with three command options, one per line. Don't add anything extra, no context, no explanations, no formatting, no code blocks.";

pub async fn run(invocation: &Invocation) -> Result<()> {
    let stdin = storage::read_stdin()?;
    if invocation.message.is_empty() && stdin.is_empty() {
        bail!("No input or commands detected");
    }

    let (config, client) = client_for("cmd")?;
    let question = storage::compose_query(&stdin, &invocation.message, "query");

    let response = client
        .complete(SYSTEM_PROMPT, &question, invocation.temperature_or(0.0))
        .await
        .context("error getting completion")?;
    let commands = clean_suggestions(&response);

    if let Err(e) = storage::store_commands(&commands) {
        warn!("failed to store suggestions: {:#}", e);
    }

    if config.zsh_abbreviations {
        let prefix = config.prefix();
        abbr::update_zsh_abbreviations(prefix, prefix, &commands)
            .context("error updating zsh abbreviations")?;
    }

    println!("{}", commands);
    Ok(())
}

/// Drops blank lines, which weaker models tend to emit between suggestions.
pub fn clean_suggestions(response: &str) -> String {
    response
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
