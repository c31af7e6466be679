use anyhow::{Context, Result};

use crate::abbr;
use crate::config::Config;
use crate::storage;

pub fn run() -> Result<()> {
    let config = Config::load().context("error loading config")?;
    let commands = storage::stored_commands().context("error reading data from disk")?;

    print!("{}", numbered(&commands));

    if config.zsh_abbreviations {
        let prefix = config.prefix();
        abbr::update_zsh_abbreviations(prefix, prefix, &commands)
            .context("error updating zsh abbreviations")?;
    }
    Ok(())
}

// Numbers follow line positions so they match the abbreviations.
fn numbered(commands: &str) -> String {
    commands
        .split('\n')
        .enumerate()
        .filter(|(_, cmd)| !cmd.is_empty())
        .map(|(i, cmd)| format!("{}: {}\n", i + 1, cmd))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_skips_blank_lines() {
        assert_eq!(numbered("ls\n\npwd"), "1: ls\n3: pwd\n");
        assert_eq!(numbered(""), "");
    }
}
