use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const DIM: &str = "\x1b[2m";
const CODE: &str = "\x1b[36m";
const HEADING: &str = "\x1b[1;35m";
const RESET: &str = "\x1b[0m";

enum ListKind {
    Bullet,
    Numbered(u64),
}

/// Renders markdown as ANSI-styled text for a terminal.
pub fn render(markdown: &str) -> String {
    let mut renderer = Renderer::default();
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Renderer {
    out: String,
    lists: Vec<ListKind>,
    quote_depth: usize,
    in_code_block: bool,
    link_urls: Vec<String>,
    // open inline styles, re-applied after every reset
    styles: Vec<&'static str>,
}

impl Renderer {
    fn event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    for line in text.lines() {
                        self.out.push_str("    ");
                        self.out.push_str(CODE);
                        self.out.push_str(line);
                        self.out.push_str(RESET);
                        self.out.push('\n');
                    }
                } else {
                    self.out.push_str(&text);
                }
            }
            Event::Code(code) => {
                self.out.push_str(CODE);
                self.out.push_str(&code);
                self.reset();
            }
            Event::SoftBreak => self.out.push(' '),
            Event::HardBreak => self.newline(),
            Event::Rule => {
                self.block_gap();
                self.out.push_str(DIM);
                self.out.push_str(&"─".repeat(40));
                self.out.push_str(RESET);
                self.out.push('\n');
            }
            Event::TaskListMarker(done) => self.out.push_str(if done { "[x] " } else { "[ ] " }),
            Event::Html(html) => self.out.push_str(&html),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Heading(level, _, _) => {
                self.block_gap();
                self.push_style(HEADING);
                if level != HeadingLevel::H1 {
                    self.out.push_str(&"#".repeat(heading_depth(level)));
                    self.out.push(' ');
                }
            }
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.block_gap();
                }
                self.quote_prefix();
            }
            Tag::BlockQuote => {
                self.block_gap();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.block_gap();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.out.push_str(&format!("    {}{}{}\n", DIM, lang, RESET));
                    }
                }
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_gap();
                } else {
                    self.newline();
                }
                self.lists.push(match start {
                    Some(n) => ListKind::Numbered(n),
                    None => ListKind::Bullet,
                });
            }
            Tag::Item => {
                self.newline();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                self.out.push_str(&indent);
                match self.lists.last_mut() {
                    Some(ListKind::Numbered(n)) => {
                        self.out.push_str(&format!("{}. ", n));
                        *n += 1;
                    }
                    _ => self.out.push_str("• "),
                }
            }
            Tag::Emphasis => self.push_style(ITALIC),
            Tag::Strong => self.push_style(BOLD),
            Tag::Strikethrough => self.push_style(DIM),
            Tag::Link(_, url, _) => {
                self.push_style(UNDERLINE);
                self.link_urls.push(url.to_string());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: Tag) {
        match tag {
            Tag::Heading(..) => {
                self.pop_style();
                self.out.push('\n');
            }
            Tag::Paragraph => self.newline(),
            Tag::BlockQuote => self.quote_depth = self.quote_depth.saturating_sub(1),
            Tag::CodeBlock(_) => self.in_code_block = false,
            Tag::List(_) => {
                self.lists.pop();
                self.newline();
            }
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough => self.pop_style(),
            Tag::Link(..) => {
                self.pop_style();
                if let Some(url) = self.link_urls.pop() {
                    self.out.push_str(&format!(" ({})", url));
                }
            }
            _ => {}
        }
    }

    fn push_style(&mut self, style: &'static str) {
        self.styles.push(style);
        self.out.push_str(style);
    }

    fn pop_style(&mut self) {
        self.styles.pop();
        self.reset();
    }

    fn reset(&mut self) {
        self.out.push_str(RESET);
        for style in &self.styles {
            self.out.push_str(style);
        }
    }

    fn newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    // one blank line between blocks, none at the start
    fn block_gap(&mut self) {
        self.newline();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn quote_prefix(&mut self) {
        if self.quote_depth > 0 {
            self.out.push_str(DIM);
            self.out.push_str(&"│ ".repeat(self.quote_depth));
            self.out.push_str(RESET);
        }
    }

    fn finish(self) -> String {
        self.out.trim_end_matches('\n').to_string()
    }
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
