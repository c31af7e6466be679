use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use clap_complete::{generate, Shell};
use std::io::{self, Write};

use crate::abbr;
use crate::cli::{self, BIN_NAME, SCRIPT_FLAGS};
use crate::config::Config;
use crate::storage;

/// Shell integration printers selected through root flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Fish,
    FishAbbr,
    ZshAbbr,
    FishCompletion,
    ZshCompletion,
}

impl Script {
    fn from_flag(name: &str) -> Option<Self> {
        match name {
            "fish" => Some(Script::Fish),
            "fish-abbr" => Some(Script::FishAbbr),
            "zsh-abbr" => Some(Script::ZshAbbr),
            "fish-completion" => Some(Script::FishCompletion),
            "zsh-completion" => Some(Script::ZshCompletion),
            _ => None,
        }
    }
}

/// The single script flag set on the root command, if any.
pub fn requested(matches: &ArgMatches) -> Result<Option<Script>> {
    let set: Vec<&str> = SCRIPT_FLAGS
        .iter()
        .copied()
        .filter(|name| matches.get_flag(name))
        .collect();

    match set.as_slice() {
        [] => Ok(None),
        [name] => Ok(Script::from_flag(name)),
        _ => bail!(
            "Only one flag to print shell feature scripts can be used at once. To enable both completions and abbreviations in one shot for fish, use --fish."
        ),
    }
}

pub fn run(script: Script) -> Result<()> {
    let mut out = io::stdout().lock();

    match script {
        Script::Fish => {
            write_fish_abbr(&mut out)?;
            write_fish_completion(&mut out)?;
        }
        Script::FishAbbr => write_fish_abbr(&mut out)?,
        Script::FishCompletion => write_fish_completion(&mut out)?,
        Script::ZshAbbr => {
            let config = Config::load().context("error loading config")?;
            let prefix = config.prefix();
            let commands = storage::stored_commands()?;
            let path = abbr::zsh_abbr_file()?;
            abbr::write_zsh_abbreviations(&path, prefix, prefix, &commands)?;
            writeln!(out, "{}", path.display())?;
        }
        Script::ZshCompletion => generate(Shell::Zsh, &mut cli::build(), BIN_NAME, &mut out),
    }
    Ok(())
}

fn write_fish_abbr(out: &mut impl Write) -> Result<()> {
    let config = Config::load().context("error loading config")?;
    let script = abbr::fish_abbr_script(config.prefix(), &storage::expansions_path()?);
    writeln!(out, "{}", script)?;
    Ok(())
}

fn write_fish_completion(out: &mut impl Write) -> Result<()> {
    generate(Shell::Fish, &mut cli::build(), BIN_NAME, &mut *out);
    // free text follows most commands, so no file name completion
    writeln!(out, "complete -c {} -f", BIN_NAME)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> ArgMatches {
        cli::build().try_get_matches_from(args).unwrap()
    }

    #[test]
    fn test_requested() {
        assert_eq!(requested(&matches(&["pal"])).unwrap(), None);
        assert_eq!(
            requested(&matches(&["pal", "--zsh-completion"])).unwrap(),
            Some(Script::ZshCompletion)
        );
        assert!(requested(&matches(&["pal", "--fish", "--fish-abbr"])).is_err());
    }

    #[test]
    fn test_every_flag_maps_to_a_script() {
        for name in SCRIPT_FLAGS {
            assert!(Script::from_flag(name).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_fish_completion_disables_files() {
        let mut buf = Vec::new();
        write_fish_completion(&mut buf).unwrap();
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("complete -c pal"));
        assert!(script.ends_with("complete -c pal -f\n"));
    }
}
