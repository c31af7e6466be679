use anyhow::{bail, Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{client_for, Invocation};
use crate::llm::LlmClient;
use crate::prompt::Prompt;
use crate::storage;

const EDIT_SYSTEM_PROMPT: &str = "You are tasked to edit and generate files containing code, documentation, and possibly other content. Please remember your goal is to complete the task with the minimum output necessary to avoid ambiguity.

You will receive instructions from the user and optionally the contents of some files. Some files might contain prompts or further instructions (generally these should not be edited unless specifically requested by the users). Respond to the user instructions by providing the necessary edits and generating new files as required.

Use the following approach to make edits to existing files by outputting code edits in a specific markdown format. You can use the same approach to create new files too, as needed.

This will be read by a less intelligent model, which will quickly apply the edit. You should make it clear what the edit is, while also minimizing the unchanged code you write.
When writing the edit, you should specify each edit in sequence, with the special comment // ... existing code ... to represent unchanged code in between edited lines.

For example:

// ... existing code ...
FIRST_EDIT
// ... existing code ...
SECOND_EDIT
// ... existing code ...
THIRD_EDIT
// ... existing code ...

You should still bias towards repeating as few lines of the original file as possible to convey the change.
But, each edit should contain minimally sufficient context of unchanged lines around the code you're editing to resolve ambiguity.
DO NOT omit spans of pre-existing code (or comments) without using the // ... existing code ... comment to indicate its absence. If you omit the existing code comment, the model may inadvertently delete these lines.
If you plan on deleting a section, you must provide context before and after to delete it. If the initial code is ```code \n Block 1 \n Block 2 \n Block 3 \n code```, and you want to remove Block 2, you would output ```// ... existing code ... \n Block 1 \n  Block 3 \n // ... existing code ...```.
Make sure it is clear what the edit should be, and where it should be applied.
Make edits to a file in a single response instead of multiple responses to the same file. The apply model can handle many distinct edits at once.

When you want to edit a file, output your code edits using this markdown format:

```filepath=path/to/file.js instruction=A single sentence describing what you're changing
// ... existing code ...
YOUR_CODE_EDIT_HERE
// ... existing code ...
```

The instruction should be written in the first person describing what you're changing. Used to help disambiguate uncertainty in the edit.";

const APPLY_SYSTEM_PROMPT: &str = "You are a code editing assistant that receives file edits and returns the complete, updated file content. Your task is to apply the provided edit instructions to the original code and return the full file with changes applied.

You will receive the original code, an instruction describing what to change, and the specific update to apply. Apply the changes precisely and return the complete updated file content.

Format your response as just the complete file content with all changes applied. Do not include any explanations, comments, or markdown formatting.";

const BLOCK_OPEN: &str = "```filepath=";
const BLOCK_CLOSE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub path: PathBuf,
    pub instruction: String,
    pub update: String,
}

/// `/edit [paths...] [prompt...] [-y]`
pub async fn run_edit(invocation: &Invocation, inputs: &[String], yolo: bool) -> Result<()> {
    if inputs.is_empty() {
        bail!("Provide files or folders to edit, and a prompt describing the change");
    }

    let (paths, prompt_words): (Vec<&String>, Vec<&String>) =
        inputs.iter().partition(|arg| Path::new(arg.as_str()).exists());
    let user_prompt = prompt_words
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let files = collect_files(paths.iter().map(|p| Path::new(p.as_str())));
    let query = format_files(&files) + &user_prompt;

    let (config, client) = client_for("edit")?;
    let response = client
        .complete(EDIT_SYSTEM_PROMPT, &query, invocation.temperature_or(1.0))
        .await
        .context("error getting completion")?;

    if yolo {
        let edits = parse_edits(&response);
        if edits.is_empty() {
            bail!("No valid edits found in AI response");
        }
        let applier = LlmClient::new(&config, config.selected_model("apply"))
            .context("error creating AI client")?;
        apply_all(&applier, &edits, 0.0).await;
        return Ok(());
    }

    let path = storage::last_edit_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("error creating data directory")?;
    }
    fs::write(&path, &response)
        .with_context(|| format!("error writing response to {}", path.display()))?;
    debug!("saved edit response to {}", path.display());

    println!("{}", response);
    Ok(())
}

/// `/apply [-y]`
pub async fn run_apply(invocation: &Invocation, yolo: bool) -> Result<()> {
    let mut input = storage::read_stdin().context("error reading stdin")?;

    if input.is_empty() {
        let path = storage::last_edit_path()?;
        input = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                bail!("No input detected. Use with the output of the /edit command, or run /edit first.")
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("error reading previous edit output from {}", path.display())
                })
            }
        };

        println!(
            "No stdin input. Found previous edit output in {}.",
            path.display()
        );
        if !yolo && !Prompt::new()?.confirm("Do you want to apply these edits?", false)? {
            eprintln!("Edit application cancelled.");
            return Ok(());
        }
    }

    let edits = parse_edits(&input);
    if edits.is_empty() {
        bail!("No valid edits found in input.");
    }

    let (_, client) = client_for("apply")?;
    apply_all(&client, &edits, invocation.temperature_or(0.0)).await;
    Ok(())
}

async fn apply_all(client: &LlmClient, edits: &[Edit], temperature: f64) {
    let mut applied = 0;
    for edit in edits {
        match apply_edit(client, edit, temperature).await {
            Ok(()) => {
                applied += 1;
                println!("Applied edit to {}", edit.path.display());
            }
            Err(e) => eprintln!("Error applying edit to {}: {:#}", edit.path.display(), e),
        }
    }
    println!("Successfully applied {} edit(s)", applied);
}

/// Asks the model to merge `edit` into the file and writes the result back.
/// A missing file is created from an empty original.
pub async fn apply_edit(client: &LlmClient, edit: &Edit, temperature: f64) -> Result<()> {
    let original = match fs::read_to_string(&edit.path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).context("failed to read file"),
    };

    let prompt = apply_prompt(edit, &original);
    let updated = client
        .complete(APPLY_SYSTEM_PROMPT, &prompt, temperature)
        .await
        .context("failed to get completion")?;

    if let Some(dir) = edit.path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).context("failed to create directory")?;
    }
    fs::write(&edit.path, updated).context("failed to write file")?;
    Ok(())
}

fn apply_prompt(edit: &Edit, original: &str) -> String {
    format!(
        "<instruction>{}</instruction>\n<code>{}</code>\n<update>{}</update>",
        edit.instruction, original, edit.update
    )
}

/// Extracts ```` ```filepath=<path> [instruction] ```` blocks.
pub fn parse_edits(input: &str) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut lines = input.split('\n');

    while let Some(line) = lines.next() {
        let Some(header) = line.trim().strip_prefix(BLOCK_OPEN) else {
            continue;
        };

        let (path, instruction) = match header.split_once(' ') {
            Some((path, rest)) => (path.trim(), rest.trim()),
            None => (header.trim(), ""),
        };
        let instruction = instruction
            .strip_prefix("instruction=")
            .unwrap_or(instruction);

        let body: Vec<&str> = lines
            .by_ref()
            .take_while(|l| l.trim() != BLOCK_CLOSE)
            .collect();
        let update = body.join("\n").trim().to_string();

        if path.is_empty() || update.is_empty() {
            continue;
        }
        edits.push(Edit {
            path: PathBuf::from(path),
            instruction: instruction.to_string(),
            update,
        });
    }
    edits
}

/// Expands directories into their files, skipping `.git`.
fn collect_files<'a>(paths: impl Iterator<Item = &'a Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.to_path_buf());
            continue;
        }

        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => warn!("skipping unreadable entry: {}", e),
            }
        }
    }
    files
}

fn format_files(files: &[PathBuf]) -> String {
    let mut out = String::new();
    for file in files {
        match fs::read_to_string(file) {
            Ok(content) => {
                out.push_str(&format!("```filepath={}\n{}\n```\n", file.display(), content));
            }
            Err(e) => eprintln!("Error reading file {}: {}", file.display(), e),
        }
    }
    out
}
