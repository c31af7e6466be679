use anyhow::{bail, Context, Result};

use super::{client_for, Invocation};
use crate::storage;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates file contents. Provide only the raw file content without any additional commentary, explanations, or markdown formatting. Do not wrap the content in code blocks (```).";

pub async fn run(invocation: &Invocation, description: &[String]) -> Result<()> {
    let stdin = storage::read_stdin()?;
    if description.is_empty() && stdin.is_empty() {
        bail!("please provide a description of the file to generate or pipe in content");
    }

    let (_, client) = client_for("file")?;
    let query = storage::compose_query(&stdin, &description.join(" "), "description");

    let response = client
        .complete(SYSTEM_PROMPT, &query, invocation.temperature_or(1.0))
        .await
        .context("error getting completion")?;

    println!("{}", strip_code_fence(&response));
    Ok(())
}

/// Removes an opening ```lang line and a closing ``` line, then trims.
pub fn strip_code_fence(content: &str) -> &str {
    let mut body = content;
    if body.starts_with("```") {
        body = body.split_once('\n').map_or("", |(_, rest)| rest);
    }

    let trimmed = body.trim_end_matches('\n');
    let last_start = trimmed.rfind('\n').map_or(0, |i| i + 1);
    if trimmed[last_start..].starts_with("```") {
        body = &trimmed[..last_start];
    }
    body.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(
            strip_code_fence("```yaml\nname: ci\non: push\n```"),
            "name: ci\non: push"
        );
        assert_eq!(strip_code_fence("```\nhello\n```\n"), "hello");
        assert_eq!(strip_code_fence("  plain text \n"), "plain text");
    }

    #[test]
    fn test_inner_fences_survive() {
        let readme = "# Title\n\n```sh\ncargo run\n```\n\nDone.";
        assert_eq!(strip_code_fence(readme), readme);
    }

    #[test]
    fn test_lone_fence() {
        assert_eq!(strip_code_fence("```rust"), "");
    }
}
