use anyhow::{bail, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::Editor;

/// Line-editing prompt for the interactive commands.
pub struct Prompt {
    editor: Editor<()>,
}

impl Prompt {
    pub fn new() -> Result<Self> {
        let editor = Editor::<()>::new().context("failed to create readline editor")?;
        Ok(Prompt { editor })
    }

    /// Reads one trimmed line. Ctrl+C aborts, Ctrl+D is an empty answer.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        match self.editor.readline(question) {
            Ok(line) => Ok(line.trim().to_string()),
            Err(ReadlineError::Eof) => Ok(String::new()),
            Err(ReadlineError::Interrupted) => bail!("cancelled"),
            Err(e) => Err(e).context("failed to read input"),
        }
    }

    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        let answer = self.ask(&format!("{} {}: ", question, hint))?;
        Ok(parse_yes_no(&answer, default))
    }
}

pub fn parse_yes_no(answer: &str, default: bool) -> bool {
    match answer.trim() {
        "" => default,
        a if a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes") => true,
        a if a.eq_ignore_ascii_case("n") || a.eq_ignore_ascii_case("no") => false,
        _ => default,
    }
}
