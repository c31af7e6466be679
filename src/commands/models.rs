use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::Config;
use crate::prompt::Prompt;

/// `/model <provider/model>`
pub fn switch(model: &str) -> Result<()> {
    let mut config = Config::load().context("error loading config")?;
    if !config.has_model(model) {
        bail!("model '{}' not found in any provider", model);
    }

    config.selected_model = model.to_string();
    config.save().context("error saving config")?;
    info!("default model is now {}", model);

    println!("Switched to model: {}", model);
    Ok(())
}

/// `/models`
pub fn select() -> Result<()> {
    let mut config = Config::load().context("error loading config")?;
    if config.providers.is_empty() {
        bail!("No providers configured. Run 'pal /config' to set up a provider");
    }

    let mut prompt = Prompt::new()?;
    select_with(&mut config, &mut prompt)?;
    config.save().context("error saving config")?;
    Ok(())
}

/// Shows the numbered model list and stores the choice in `config`.
/// Used by `/models` and the setup wizard.
pub(crate) fn select_with(config: &mut Config, prompt: &mut Prompt) -> Result<()> {
    let models = config.available_models();

    println!("\nAvailable models:");
    for (i, model) in models.iter().enumerate() {
        println!("{}. {}", i + 1, model);
    }

    let question = if config.selected_model.is_empty() {
        "\nEnter model number or press Enter for default (1): ".to_string()
    } else {
        println!("\nCurrently selected: {}", config.selected_model);
        "\nEnter model number or press Enter to keep current: ".to_string()
    };
    let answer = prompt.ask(&question)?;

    if let Some(model) = resolve_choice(&answer, &models, &config.selected_model)? {
        config.selected_model = model;
    }
    println!("Model set to: {}", config.selected_model);
    Ok(())
}

/// `None` keeps the current model; an empty answer without one picks the first.
pub fn resolve_choice(answer: &str, models: &[String], current: &str) -> Result<Option<String>> {
    let answer = answer.trim();
    if answer.is_empty() {
        if !current.is_empty() {
            return Ok(None);
        }
        return match models.first() {
            Some(first) => Ok(Some(first.clone())),
            None => bail!("No models available"),
        };
    }

    match answer.parse::<usize>() {
        Ok(n) if (1..=models.len()).contains(&n) => Ok(Some(models[n - 1].clone())),
        _ => bail!("Invalid model number"),
    }
}
