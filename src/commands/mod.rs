use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use tracing::debug;

use crate::config::Config;
use crate::llm::LlmClient;

mod ask;
mod edit;
mod file;
mod models;
mod scripts;
mod setup;
mod show;
mod suggest;

/// Everything a command needs from the command line.
pub struct Invocation {
    /// Free text carved off by the preparser, joined with spaces.
    pub message: String,
    temperature: Option<f64>,
    pub markdown_toggle: bool,
}

impl Invocation {
    pub fn new(matches: &ArgMatches, free_text: &[String]) -> Result<Self> {
        // globals may be given before or after the subcommand
        let sub = matches.subcommand().map(|(_, m)| m);
        let temperature = sub
            .and_then(|m| m.get_one::<f64>("temperature"))
            .or_else(|| matches.get_one::<f64>("temperature"))
            .copied();

        if let Some(t) = temperature {
            if !(0.0..=2.0).contains(&t) {
                bail!("Temperature must be between 0 and 2");
            }
        }

        let markdown_toggle =
            sub.is_some_and(|m| m.get_flag("markdown")) || matches.get_flag("markdown");

        Ok(Invocation {
            message: free_text.join(" "),
            temperature,
            markdown_toggle,
        })
    }

    /// Explicit `-t` value, else the command's own default.
    pub fn temperature_or(&self, default: f64) -> f64 {
        self.temperature.unwrap_or(default)
    }
}

/// Loads and validates the config, then builds a client for `command`'s model.
pub(crate) fn client_for(command: &str) -> Result<(Config, LlmClient)> {
    let config = Config::load().context("error loading config")?;
    config.check()?;
    let client = LlmClient::new(&config, config.selected_model(command))
        .context("error creating AI client")?;
    debug!("{} uses model {}", command, client.model());
    Ok((config, client))
}

pub async fn dispatch(matches: &ArgMatches, free_text: &[String]) -> Result<()> {
    let invocation = Invocation::new(matches, free_text)?;

    match matches.subcommand() {
        Some(("/cmd", _)) => suggest::run(&invocation).await,
        Some(("/ask", _)) => ask::run(&invocation).await,
        Some(("/model", sub)) => {
            let model = sub
                .get_one::<String>("model")
                .context("missing model name")?;
            models::switch(model)
        }
        Some(("/models", _)) => models::select(),
        Some(("/show", _)) => show::run(),
        Some(("/config", _)) => setup::run(),
        Some(("/file", sub)) => file::run(&invocation, &words(sub, "description")).await,
        Some(("/edit", sub)) => {
            let inputs = words(sub, "inputs");
            edit::run_edit(&invocation, &inputs, sub.get_flag("yolo")).await
        }
        Some(("/apply", sub)) => edit::run_apply(&invocation, sub.get_flag("yolo")).await,
        Some((other, _)) => bail!("Unknown command: {}", other),
        None => match scripts::requested(matches)? {
            Some(script) => scripts::run(script),
            None => suggest::run(&invocation).await,
        },
    }
}

fn words(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .into_iter()
        .flatten()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli;
    use crate::preparse::grammar_end;

    fn parse(args: &[&str]) -> (ArgMatches, Vec<String>) {
        let split = grammar_end(args, &cli::registry());
        let matches = cli::build().try_get_matches_from(&args[..split]).unwrap();
        let free = args[split..].iter().map(|s| s.to_string()).collect();
        (matches, free)
    }

    fn invocation(args: &[&str]) -> Result<Invocation> {
        let (matches, free) = parse(args);
        Invocation::new(&matches, &free)
    }

    #[test]
    fn test_free_text_message() {
        let inv = invocation(&["pal", "find", "big", "files"]).unwrap();
        assert_eq!(inv.message, "find big files");
        assert_eq!(inv.temperature_or(0.0), 0.0);
        assert!(!inv.markdown_toggle);
    }

    #[test]
    fn test_flags_before_subcommand() {
        let inv = invocation(&["pal", "-t", "1.5", "-m", "/ask", "why", "-t"]).unwrap();
        assert_eq!(inv.message, "why -t");
        assert_eq!(inv.temperature_or(1.0), 1.5);
        assert!(inv.markdown_toggle);
    }

    #[test]
    fn test_temperature_after_subcommand() {
        let inv = invocation(&["pal", "/edit", "-t", "0.3", "src"]).unwrap();
        assert_eq!(inv.temperature_or(1.0), 0.3);
        assert_eq!(inv.message, "");
    }

    #[test]
    fn test_words_after_global_flag() {
        let (matches, free) = parse(&["pal", "-t1", "/file", "a", "readme"]);
        assert!(free.is_empty());
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(words(sub, "description"), ["a", "readme"]);

        let (matches, free) = parse(&["pal", "-m", "/edit", "-y", "src", "tidy"]);
        assert!(free.is_empty());
        let (_, sub) = matches.subcommand().unwrap();
        assert!(sub.get_flag("yolo"));
        assert_eq!(words(sub, "inputs"), ["src", "tidy"]);
    }

    #[test]
    fn test_model_after_global_flag() {
        let (matches, _) = parse(&["pal", "-t1", "/model", "deepseek/deepseek-chat"]);
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "/model");
        assert_eq!(
            sub.get_one::<String>("model").map(String::as_str),
            Some("deepseek/deepseek-chat")
        );
    }

    #[test]
    fn test_temperature_out_of_range() {
        assert!(invocation(&["pal", "-t3", "/ask", "hi"]).is_err());
        assert!(invocation(&["pal", "--temperature=-0.1", "/cmd", "hi"]).is_err());
    }
}
