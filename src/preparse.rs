use std::collections::HashMap;

/// How many argv tokens a flag takes and whether it ends normal processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Switch,
    Value,
    // help, version and the script printers
    Terminal,
}

#[derive(Debug, Clone)]
pub struct FlagSpec {
    pub long: &'static str,
    pub short: Option<char>,
    pub arity: Arity,
}

#[derive(Debug, Clone)]
pub struct SubcommandSpec {
    pub name: &'static str,
    pub takes_free_text: bool,
}

/// Flags and `/`-subcommands known to the command grammar.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    flags: Vec<FlagSpec>,
    subcommands: HashMap<&'static str, SubcommandSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(mut self, long: &'static str, short: Option<char>, arity: Arity) -> Self {
        self.flags.push(FlagSpec { long, short, arity });
        self
    }

    pub fn subcommand(mut self, name: &'static str, takes_free_text: bool) -> Self {
        self.subcommands.insert(
            name,
            SubcommandSpec {
                name,
                takes_free_text,
            },
        );
        self
    }

    pub fn long_flag(&self, name: &str) -> Option<&FlagSpec> {
        self.flags.iter().find(|f| f.long == name)
    }

    pub fn short_flag(&self, c: char) -> Option<&FlagSpec> {
        self.flags.iter().find(|f| f.short == Some(c))
    }

    pub fn lookup(&self, name: &str) -> Option<&SubcommandSpec> {
        self.subcommands.get(name)
    }

    pub fn flags(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.iter()
    }

    pub fn subcommands(&self) -> impl Iterator<Item = &SubcommandSpec> {
        self.subcommands.values()
    }
}

struct FlagRun {
    end: usize,
    saw_terminal: bool,
}

/// Finds where the flag/subcommand grammar ends and the free-text user
/// message begins. `args[..split]` goes to the command parser,
/// `args[split..]` is joined into the query.
///
/// Never fails: anything the grammar can't claim degrades into free text,
/// and unknown flags are left for the command parser to reject.
pub fn split_index<S: AsRef<str>>(args: &[S], registry: &Registry) -> usize {
    let Some(first) = args.get(1).map(AsRef::as_ref) else {
        return 1;
    };

    if first.starts_with('/') {
        return match registry.lookup(first) {
            Some(cmd) if !cmd.takes_free_text => args.len(),
            _ => 2,
        };
    }

    if !first.starts_with('-') {
        return 1;
    }

    // Only the subcommand token joins the grammar here, whatever its
    // free-text setting.
    let subcommand = args
        .iter()
        .enumerate()
        .skip(2)
        .find(|(_, token)| token.as_ref().starts_with('/'));
    match subcommand {
        Some((i, _)) => i + 1,
        // Quirk: a leading flag with no `/` token after it is handed back as
        // user text, so `pal -t0.7` asks about "-t0.7".
        None => 1,
    }
}

/// [`split_index`] widened for the command parser.
///
/// A line made only of flags that holds a terminal flag (`pal --help`,
/// `pal -t1 --fish`) goes to the parser whole, and so does everything after
/// a subcommand that parses its own arguments (`pal -t1 /model a/b`).
pub fn grammar_end<S: AsRef<str>>(args: &[S], registry: &Registry) -> usize {
    let split = split_index(args, registry);

    if split == 1 {
        let run = scan_flags(args, registry);
        return if run.saw_terminal && run.end == args.len() {
            args.len()
        } else {
            1
        };
    }

    let owns_rest = args
        .get(split - 1)
        .and_then(|token| registry.lookup(token.as_ref()))
        .is_some_and(|cmd| !cmd.takes_free_text);
    if owns_rest {
        args.len()
    } else {
        split
    }
}

fn scan_flags<S: AsRef<str>>(args: &[S], registry: &Registry) -> FlagRun {
    let mut i = 1;
    let mut saw_terminal = false;

    while let Some(token) = args.get(i).map(AsRef::as_ref) {
        let (flag, fused) = if let Some(long) = token.strip_prefix("--") {
            // exact match on the name, `--temp` is not `--temperature`
            match long.split_once('=') {
                Some((name, _)) => (registry.long_flag(name), true),
                None => (registry.long_flag(long), false),
            }
        } else if let Some(short) = token.strip_prefix('-') {
            let mut chars = short.chars();
            let flag = chars.next().and_then(|c| registry.short_flag(c));
            (flag, !chars.as_str().is_empty())
        } else {
            break;
        };

        match flag.map(|f| f.arity) {
            Some(Arity::Value) if !fused => i += 2,
            Some(Arity::Terminal) => {
                saw_terminal = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    FlagRun {
        end: i.min(args.len()),
        saw_terminal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new()
            .flag("temperature", Some('t'), Arity::Value)
            .flag("markdown", Some('m'), Arity::Switch)
            .flag("help", Some('h'), Arity::Terminal)
            .flag("version", Some('V'), Arity::Terminal)
            .flag("zsh-abbr", None, Arity::Terminal)
            .subcommand("/ask", true)
            .subcommand("/cmd", true)
            .subcommand("/model", false)
            .subcommand("/edit", false)
    }

    fn split(args: &[&str]) -> usize {
        split_index(args, &registry())
    }

    #[test]
    fn test_scenarios() {
        let cases: &[(&[&str], usize)] = &[
            (&["prog", "some", "input"], 1),
            (&["prog", "/command", "arg"], 2),
            (&["prog", "-t0.7"], 1),
            (&["prog", "/foo"], 2),
            (&["prog", "-t0.7", "/foo"], 3),
            (&["prog", "/ask", "what", "is", "-t"], 2),
            (&["prog", "-t0.7", "/ask", "what", "is", "-t"], 3),
            (&["prog", "/model", "sooperAI/pal"], 3),
        ];

        for (args, expected) in cases {
            assert_eq!(split(args), *expected, "args: {:?}", args);
        }
    }

    #[test]
    fn test_program_name_only() {
        assert_eq!(split(&["prog"]), 1);
        assert_eq!(split_index::<&str>(&[], &registry()), 1);
    }

    #[test]
    fn test_value_flag_forms_before_subcommand() {
        assert_eq!(split(&["prog", "-t", "0.5", "/ask", "hi"]), 4);
        assert_eq!(split(&["prog", "--temperature", "0.5", "/ask", "hi"]), 4);
        assert_eq!(split(&["prog", "--temperature=0.5", "/ask", "hi"]), 3);
        assert_eq!(
            split(&["prog", "-t", "0.7", "--temperature=0.8", "-m", "/foo"]),
            6
        );
    }

    #[test]
    fn test_first_slash_token_after_flag() {
        assert_eq!(split(&["prog", "-t0.7", "what", "/ask", "x"]), 4);
        // a value flag does not hide the subcommand
        assert_eq!(split(&["prog", "-t", "/ask", "q"]), 3);
        assert_eq!(split(&["prog", "-t0.7", "how", "do", "I", "cd", "/tmp"]), 7);
        assert_eq!(split(&["prog", "--temp", "0.5", "/ask", "q"]), 4);
    }

    #[test]
    fn test_flags_without_subcommand_become_free_text() {
        assert_eq!(split(&["prog", "-t", "0.5", "some", "input"]), 1);
        assert_eq!(split(&["prog", "-m", "list", "files"]), 1);
        assert_eq!(split(&["prog", "-h", "some", "input"]), 1);
        assert_eq!(split(&["prog", "--help"]), 1);
        assert_eq!(split(&["prog", "-t"]), 1);
    }

    #[test]
    fn test_subcommand_after_flags_ignores_free_text_setting() {
        assert_eq!(split(&["prog", "-t1", "/model", "a/b"]), 3);
        assert_eq!(split(&["prog", "-m", "/edit", "-y", "src", "tidy"]), 3);
        assert_eq!(split(&["prog", "/edit", "src", "-y", "tidy", "up"]), 6);
    }

    fn grammar(args: &[&str]) -> usize {
        grammar_end(args, &registry())
    }

    #[test]
    fn test_terminal_flags_reach_the_grammar() {
        assert_eq!(grammar(&["prog", "--help"]), 2);
        assert_eq!(grammar(&["prog", "--version"]), 2);
        assert_eq!(grammar(&["prog", "-t0.7", "-V"]), 3);
        assert_eq!(grammar(&["prog", "-t", "1", "--zsh-abbr"]), 4);
        assert_eq!(grammar(&["prog", "-V", "-t"]), 3);
        // anything besides flags keeps the line as free text
        assert_eq!(grammar(&["prog", "-h", "some", "input"]), 1);
        assert_eq!(grammar(&["prog", "-t0.7"]), 1);
        assert_eq!(grammar(&["prog", "-m", "list", "files"]), 1);
    }

    #[test]
    fn test_long_flags_match_exactly() {
        assert_eq!(grammar(&["prog", "--helpme"]), 1);
        assert_eq!(grammar(&["prog", "--zsh-abbr=1"]), 2);
    }

    #[test]
    fn test_subcommand_keeps_its_own_arguments() {
        assert_eq!(grammar(&["prog", "-t1", "/model", "a/b"]), 4);
        assert_eq!(grammar(&["prog", "-m", "/edit", "-y", "src", "tidy"]), 6);
        assert_eq!(grammar(&["prog", "-t0.7", "/ask", "what", "is", "-t"]), 3);
        assert_eq!(grammar(&["prog", "/ask", "what"]), 2);
        assert_eq!(grammar(&["prog", "some", "input"]), 1);
        assert_eq!(grammar(&["prog"]), 1);
    }

    #[test]
    fn test_split_stays_in_range_and_is_repeatable() {
        let inputs: &[&[&str]] = &[
            &["prog"],
            &["prog", "-"],
            &["prog", "--"],
            &["prog", "/"],
            &["prog", "-t", "/ask"],
            &["prog", "--temperature"],
            &["prog", "-x", "-y", "-z"],
            &["prog", "/model"],
            &["prog", "-h", "-t", "1", "/cmd", "a", "b"],
        ];

        let registry = registry();
        for args in inputs {
            let first = split_index(args, &registry);
            assert!((1..=args.len()).contains(&first), "args: {:?}", args);
            assert_eq!(split_index(args, &registry), first);

            let end = grammar_end(args, &registry);
            assert!((1..=args.len()).contains(&end), "args: {:?}", args);
        }
    }

    #[test]
    fn test_owned_arguments() {
        let args: Vec<String> = vec!["prog".into(), "/ask".into(), "hello".into()];
        assert_eq!(split_index(&args, &registry()), 2);
    }
}
