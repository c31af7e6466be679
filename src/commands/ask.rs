use anyhow::{bail, Context, Result};

use super::{client_for, Invocation};
use crate::markdown;
use crate::storage;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that runs in the users shell but can answer on any topic. Keep responses concise";

const PLAIN_SUFFIX: &str = " and avoid using Markdown formatting that won't render in a shell. Lists and bullets are fine, but avoid headings, bold, and italic text.";

pub async fn run(invocation: &Invocation) -> Result<()> {
    let stdin = storage::read_stdin()?;
    if invocation.message.is_empty() && stdin.is_empty() {
        bail!("No input detected. Please write or pipe in a query");
    }

    let (config, client) = client_for("ask")?;
    let question = storage::compose_query(&stdin, &invocation.message, "query");

    // -m flips whatever the config says
    let render = config.format_markdown != invocation.markdown_toggle;
    let system_prompt = system_prompt(render);

    let response = client
        .complete(&system_prompt, &question, invocation.temperature_or(1.0))
        .await
        .context("error getting completion")?;

    if render {
        println!("{}", markdown::render(&response));
    } else {
        println!("{}", response);
    }
    Ok(())
}

fn system_prompt(render_markdown: bool) -> String {
    if render_markdown {
        SYSTEM_PROMPT.to_string()
    } else {
        format!("{}{}", SYSTEM_PROMPT, PLAIN_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prompt_discourages_markdown() {
        assert_eq!(system_prompt(true), SYSTEM_PROMPT);
        assert!(system_prompt(false).ends_with("bold, and italic text."));
    }
}
