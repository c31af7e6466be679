use anyhow::{Context, Result};
use nix::unistd::getppid;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::models;
use crate::abbr;
use crate::config::{Config, Provider, DEFAULT_PREFIX, PROVIDER_TEMPLATES};
use crate::prompt::Prompt;
use crate::storage;

/// `/config`: interactive setup wizard.
pub fn run() -> Result<()> {
    let existing = Config::load().unwrap_or_else(|e| {
        warn!("ignoring unreadable config: {}", e);
        Config::default()
    });
    let mut prompt = Prompt::new()?;

    let mut config = Config {
        providers: existing.providers.clone(),
        selected_models: existing.selected_models.clone(),
        ..Config::default()
    };

    configure_providers(&mut config, &existing, &mut prompt)?;
    config.abbreviation_prefix = choose_prefix(&existing, &mut prompt)?;

    if parent_is_zsh() {
        config.zsh_abbreviations = prompt.confirm(
            "Do you want to enable zsh abbreviations? This requires the zsh-abbr plugin. Any abbreviations with the form \"$prefix$i\" will be overwritten.",
            existing.zsh_abbreviations,
        )?;
    }

    config.format_markdown = if existing.format_markdown {
        prompt.confirm("Markdown formatting is currently enabled. Keep it enabled?", true)?
    } else {
        prompt.confirm("Markdown formatting is currently disabled. Enable it?", false)?
    };

    if !config.providers.is_empty() {
        if existing.selected_model.is_empty() {
            models::select_with(&mut config, &mut prompt)?;
        } else {
            config.selected_model = existing.selected_model.clone();
        }
    }

    let path = config.save().context("error saving config")?;
    println!("\nConfig saved successfully at {}", path.display());
    Ok(())
}

fn configure_providers(config: &mut Config, existing: &Config, prompt: &mut Prompt) -> Result<()> {
    loop {
        if !config.providers.is_empty() {
            println!("\nConfigured providers:");
            for name in config.providers.keys() {
                println!("{}", name);
            }
        }

        println!("\nAvailable providers:");
        for (i, (name, _, _)) in PROVIDER_TEMPLATES.iter().enumerate() {
            println!("{}. {}", i + 1, name);
        }

        let answer = prompt.ask(&format!(
            "\nPress enter when done, or select provider (1-{}): ",
            PROVIDER_TEMPLATES.len()
        ))?;
        if answer.is_empty() {
            return Ok(());
        }

        let name = match answer.parse::<usize>() {
            Ok(n) if (1..=PROVIDER_TEMPLATES.len()).contains(&n) => PROVIDER_TEMPLATES[n - 1].0,
            _ => {
                println!("Invalid choice. Please try again.");
                continue;
            }
        };

        let current_key = existing
            .providers
            .get(name)
            .map(|p| p.api_key.as_str())
            .filter(|k| !k.is_empty());
        let api_key = match current_key {
            Some(key) => {
                let answer = prompt.ask(&format!(
                    "Found existing API key for {}. Press enter to keep it, or enter a new one: ",
                    name
                ))?;
                if answer.is_empty() {
                    key.to_string()
                } else {
                    answer
                }
            }
            None => prompt.ask(&format!("Enter your {} API key: ", name))?,
        };

        if let Some(provider) = Provider::from_template(name, &api_key) {
            config.providers.insert(name.to_string(), provider);
        }
    }
}

fn choose_prefix(existing: &Config, prompt: &mut Prompt) -> Result<String> {
    let current = &existing.abbreviation_prefix;
    if current.is_empty() {
        let answer = prompt.ask(&format!(
            "Enter abbreviation prefix (default '{}'): ",
            DEFAULT_PREFIX
        ))?;
        return Ok(if answer.is_empty() {
            DEFAULT_PREFIX.to_string()
        } else {
            answer
        });
    }

    let answer = prompt.ask(&format!(
        "Current abbreviation prefix is '{}'. Press enter to keep it, or enter a new one: ",
        current
    ))?;
    if answer.is_empty() || answer == *current {
        return Ok(current.clone());
    }

    // move the existing zsh abbreviations over to the new prefix
    if existing.zsh_abbreviations {
        match storage::stored_commands() {
            Ok(commands) if !commands.is_empty() => {
                if let Err(e) = abbr::update_zsh_abbreviations(current, &answer, &commands) {
                    eprintln!("Error updating zsh abbreviations: {:#}", e);
                }
            }
            Ok(_) => {}
            Err(e) => eprintln!("Error reading data from disk: {:#}", e),
        }
    }
    Ok(answer)
}

fn parent_is_zsh() -> bool {
    let comm = format!("/proc/{}/comm", getppid());
    match fs::read_to_string(&comm) {
        Ok(name) => is_zsh(&name),
        Err(e) => {
            debug!("cannot read {}: {}", comm, e);
            false
        }
    }
}

fn is_zsh(comm: &str) -> bool {
    Path::new(comm.trim())
        .file_name()
        .is_some_and(|name| name == "zsh")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_zsh() {
        assert!(is_zsh("zsh\n"));
        assert!(is_zsh("/usr/bin/zsh"));
        assert!(!is_zsh("bash\n"));
        assert!(!is_zsh("zsh-5.9"));
        assert!(!is_zsh(""));
    }
}
