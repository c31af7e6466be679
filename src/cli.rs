use clap::{value_parser, Arg, ArgAction, Command};

use crate::preparse::{Arity, Registry};

pub const BIN_NAME: &str = "pal";

// Script printers: commands that have to look like flags, since the
// subcommand namespace is taken by `/` names.
pub const SCRIPT_FLAGS: [&str; 5] = [
    "fish",
    "fish-abbr",
    "zsh-abbr",
    "fish-completion",
    "zsh-completion",
];

/// Registry mirror of [`build`], consulted before clap sees argv.
pub fn registry() -> Registry {
    let mut registry = Registry::new()
        .flag("help", Some('h'), Arity::Terminal)
        .flag("version", Some('V'), Arity::Terminal)
        .flag("temperature", Some('t'), Arity::Value)
        .flag("markdown", Some('m'), Arity::Switch);

    for name in SCRIPT_FLAGS {
        registry = registry.flag(name, None, Arity::Terminal);
    }

    registry
        .subcommand("/cmd", true)
        .subcommand("/ask", true)
        .subcommand("/model", false)
        .subcommand("/models", false)
        .subcommand("/show", false)
        .subcommand("/config", false)
        .subcommand("/file", false)
        .subcommand("/edit", false)
        .subcommand("/apply", false)
}

pub fn build() -> Command {
    Command::new(BIN_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("pal is a command-line tool that suggests shell commands")
        .long_about(
            "pal is a command-line tool that suggests shell commands based on your input.\n\
             It uses AI to generate commands and can also manage shell abbreviations.",
        )
        .disable_help_subcommand(true)
        .arg(
            Arg::new("temperature")
                .short('t')
                .long("temperature")
                .value_name("TEMPERATURE")
                .value_parser(value_parser!(f64))
                .global(true)
                .help("Set the temperature for the AI model, between 0 and 2 (higher values make output more random)"),
        )
        .arg(
            Arg::new("markdown")
                .short('m')
                .long("markdown")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Toggle markdown formatting of answers relative to the config"),
        )
        .arg(script_flag("fish", "Print fish abbreviation script and completion script, then exit. Output is meant to be sourced by fish."))
        .arg(script_flag("fish-abbr", "Print fish abbreviation script and exit. Output is meant to be sourced by fish."))
        .arg(script_flag("zsh-abbr", "Write the current suggestions to the zsh-abbr file and print its path"))
        .arg(script_flag("fish-completion", "Print fish autocompletion script and exit. Output is meant to be sourced by fish."))
        .arg(script_flag("zsh-completion", "Print zsh autocompletion script and exit. Output is meant to be sourced by zsh."))
        .subcommand(Command::new("/cmd").about("Get command suggestions (default)"))
        .subcommand(Command::new("/ask").about("Ask a question to the AI"))
        .subcommand(
            Command::new("/model")
                .about("Switch to a specific model")
                .arg(
                    Arg::new("model")
                        .value_name("PROVIDER/MODEL")
                        .required(true),
                ),
        )
        .subcommand(Command::new("/models").about("Select a model from the configured providers"))
        .subcommand(Command::new("/show").about("Show the last generated commands"))
        .subcommand(Command::new("/config").about("Configure pal"))
        .subcommand(
            Command::new("/file")
                .about("Generate file contents based on a description")
                .arg(words_arg("description", "Description of the file to generate")),
        )
        .subcommand(
            Command::new("/edit")
                .about("Edit files or groups of files")
                .long_about(
                    "Edit files or groups of files.\n\
                     Accepts a list of file and folder names along with an optional prompt.\n\
                     The prompt can also be included in the contents of one or more files.",
                )
                .arg(yolo_flag("Automatically apply edits without confirmation"))
                .arg(words_arg("inputs", "Files, folders and prompt words")),
        )
        .subcommand(
            Command::new("/apply")
                .about("Apply edits to files")
                .long_about(
                    "Apply edits to files.\n\
                     Reads edit instructions from stdin and applies them to the specified files.\n\
                     Use with the output of the /edit command.",
                )
                .arg(yolo_flag(
                    "Automatically apply edits without confirmation when using previous edit output",
                )),
        )
}

fn script_flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

fn yolo_flag(help: &'static str) -> Arg {
    Arg::new("yolo")
        .short('y')
        .long("yolo")
        .action(ArgAction::SetTrue)
        .help(help)
}

fn words_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .num_args(0..)
        .trailing_var_arg(true)
        .allow_hyphen_values(true)
        .help(help)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preparse::grammar_end;

    fn parse(args: &[&str]) -> clap::ArgMatches {
        let split = grammar_end(args, &registry());
        build().try_get_matches_from(&args[..split]).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() {
        build().debug_assert();
    }

    #[test]
    fn test_registry_matches_grammar() {
        let registry = registry();
        let cmd = build();

        let names: Vec<&str> = cmd.get_subcommands().map(|c| c.get_name()).collect();
        for sub in registry.subcommands() {
            assert!(names.contains(&sub.name), "missing subcommand {}", sub.name);
        }
        assert_eq!(names.len(), registry.subcommands().count());

        for flag in registry.flags() {
            if flag.long == "help" || flag.long == "version" {
                continue;
            }
            let arg = cmd
                .get_arguments()
                .find(|a| a.get_long() == Some(flag.long))
                .unwrap_or_else(|| panic!("missing flag --{}", flag.long));
            assert_eq!(arg.get_short(), flag.short);
        }
    }

    #[test]
    fn test_temperature_before_free_text_subcommand() {
        let matches = parse(&["pal", "-t0.7", "/ask", "what", "is", "-t"]);
        assert_eq!(matches.get_one::<f64>("temperature"), Some(&0.7));
        assert_eq!(matches.subcommand_name(), Some("/ask"));
    }

    #[test]
    fn test_model_takes_positional() {
        let matches = parse(&["pal", "/model", "sooperAI/pal"]);
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "/model");
        assert_eq!(
            sub.get_one::<String>("model").map(String::as_str),
            Some("sooperAI/pal")
        );
    }

    #[test]
    fn test_edit_keeps_flags_and_words() {
        let matches = parse(&["pal", "/edit", "-y", "src", "rename", "--all"]);
        let (_, sub) = matches.subcommand().unwrap();
        assert!(sub.get_flag("yolo"));
        let words: Vec<&String> = sub.get_many::<String>("inputs").unwrap().collect();
        assert_eq!(words, ["src", "rename", "--all"]);
    }

    #[test]
    fn test_subcommand_arguments_after_global_flags() {
        let matches = parse(&["pal", "-t1", "/model", "deepseek/deepseek-chat"]);
        assert_eq!(matches.get_one::<f64>("temperature"), Some(&1.0));
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(
            sub.get_one::<String>("model").map(String::as_str),
            Some("deepseek/deepseek-chat")
        );

        let matches = parse(&["pal", "-m", "/edit", "-y", "src", "tidy"]);
        assert!(matches.get_flag("markdown"));
        let (_, sub) = matches.subcommand().unwrap();
        assert!(sub.get_flag("yolo"));
        let words: Vec<&String> = sub.get_many::<String>("inputs").unwrap().collect();
        assert_eq!(words, ["src", "tidy"]);
    }

    #[test]
    fn test_help_and_script_flags_reach_clap() {
        let err = build().try_get_matches_from(["pal", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

        let matches = parse(&["pal", "-t", "1", "--fish"]);
        assert!(matches.get_flag("fish"));
    }

    #[test]
    fn test_plain_query_has_no_subcommand() {
        let matches = parse(&["pal", "list", "files"]);
        assert!(matches.subcommand().is_none());
        assert!(!matches.get_flag("markdown"));
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        let args = ["pal", "/nope", "x"];
        let split = grammar_end(&args, &registry());
        assert!(build().try_get_matches_from(&args[..split]).is_err());
    }
}
