use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

const FISH_ABBR_SCRIPT: &str = include_str!("abbr.fish");

/// Fish snippet that expands `<prefix><n>` from line n+1 of the expansions file.
pub fn fish_abbr_script(prefix: &str, expansions: &Path) -> String {
    format!(
        "set -g pal_prefix \"{}\"\nset -g pal_abbr_file \"{}\"\n{}\n",
        prefix,
        expansions.display(),
        FISH_ABBR_SCRIPT
    )
}

pub fn zsh_abbr_file() -> Result<PathBuf> {
    if let Some(path) = env::var_os("ABBR_USER_ABBREVIATIONS_FILE").filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().context("failed to find the home directory")?;
    Ok(home.join(".config/zsh-abbr/user-abbreviations"))
}

/// Drops `abbr <remove_prefix>0..9=` entries and blank lines, then appends one
/// `abbr <add_prefix><n>='...'` per command, numbered from 1.
pub fn rewrite_zsh_abbreviations(
    existing: &str,
    remove_prefix: &str,
    add_prefix: &str,
    commands: &str,
) -> String {
    let stale: Vec<String> = (0..=9)
        .map(|i| format!("abbr {}{}=", remove_prefix, i))
        .collect();

    let mut lines: Vec<String> = existing
        .lines()
        .filter(|line| !line.is_empty())
        .filter(|line| !stale.iter().any(|p| line.starts_with(p.as_str())))
        .map(str::to_string)
        .collect();

    for (i, command) in commands.split('\n').enumerate() {
        if command.is_empty() {
            continue;
        }
        lines.push(format!(
            "abbr {}{}='{}'",
            add_prefix,
            i + 1,
            command.replace('\'', "'\\''")
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn update_zsh_abbreviations(remove_prefix: &str, add_prefix: &str, commands: &str) -> Result<()> {
    let path = zsh_abbr_file()?;
    write_zsh_abbreviations(&path, remove_prefix, add_prefix, commands)?;

    let status = Command::new("zsh")
        .args(["-c", "source ~/.zshrc && abbr load"])
        .status()
        .context("error reloading abbreviations")?;
    if !status.success() {
        bail!("error reloading abbreviations: zsh exited with {}", status);
    }
    info!("reloaded zsh abbreviations");
    Ok(())
}

pub fn write_zsh_abbreviations(
    path: &Path,
    remove_prefix: &str,
    add_prefix: &str,
    commands: &str,
) -> Result<()> {
    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).context("error reading abbreviations file"),
    };

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("error creating directories")?;
    }
    fs::write(
        path,
        rewrite_zsh_abbreviations(&existing, remove_prefix, add_prefix, commands),
    )
    .context("error writing abbreviations file")?;

    debug!("rewrote {}", path.display());
    Ok(())
}
