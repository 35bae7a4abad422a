//! Markdown to ANSI terminal text.
//!
//! [`MarkdownRenderer`] is the contract the rest of the crate relies on;
//! [`TerminalMarkdown`] implements it on top of the `pulldown-cmark` event
//! stream, wrapping paragraphs to a fixed width.

use std::env;
use std::str::FromStr;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{Error, Result};

/// Environment variable selecting the [`MarkdownStyle`].
pub const STYLE_ENV: &str = "GEMI_STYLE";

const DEFAULT_WIDTH: usize = 100;
const MIN_WIDTH: usize = 20;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const STRIKE: &str = "\x1b[9m";

/// Turns Markdown into text ready for the terminal.
pub trait MarkdownRenderer: Send + Sync {
    /// Render `markdown`.  Partial documents (an unterminated code fence, say)
    /// must render without error.
    fn render(&self, markdown: &str) -> Result<String>;
}

/// Colour theme for rendered Markdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkdownStyle {
    /// Colours for dark terminal backgrounds.
    #[default]
    Dark,
    /// Colours for light terminal backgrounds.
    Light,
    /// No escape sequences at all.
    NoTty,
}

impl MarkdownStyle {
    /// Reads the style from `GEMI_STYLE`; unset or empty means [`MarkdownStyle::Dark`].
    pub fn from_env() -> Result<Self> {
        match env::var(STYLE_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::default()),
        }
    }

    fn palette(self) -> Option<&'static Palette> {
        match self {
            MarkdownStyle::Dark => Some(&DARK),
            MarkdownStyle::Light => Some(&LIGHT),
            MarkdownStyle::NoTty => None,
        }
    }
}

impl FromStr for MarkdownStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(MarkdownStyle::Dark),
            "light" => Ok(MarkdownStyle::Light),
            "notty" | "plain" | "ascii" => Ok(MarkdownStyle::NoTty),
            other => Err(Error::config(format!(
                "unknown {STYLE_ENV} value {other:?}; expected dark, light or notty"
            ))),
        }
    }
}

struct Palette {
    heading: &'static str,
    code: &'static str,
    code_block: &'static str,
    link: &'static str,
    quote: &'static str,
    rule: &'static str,
    bullet: &'static str,
}

const DARK: Palette = Palette {
    heading: "\x1b[1;38;5;39m",
    code: "\x1b[38;5;203m",
    code_block: "\x1b[38;5;252m",
    link: "\x1b[4;38;5;30m",
    quote: "\x1b[38;5;244m",
    rule: "\x1b[38;5;240m",
    bullet: "\x1b[38;5;212m",
};

const LIGHT: Palette = Palette {
    heading: "\x1b[1;38;5;27m",
    code: "\x1b[38;5;160m",
    code_block: "\x1b[38;5;236m",
    link: "\x1b[4;38;5;31m",
    quote: "\x1b[38;5;242m",
    rule: "\x1b[38;5;250m",
    bullet: "\x1b[38;5;162m",
};

/// Width of the attached terminal, if stdout is one.
pub fn terminal_columns() -> Option<usize> {
    match crossterm::terminal::size() {
        Ok((columns, _)) if columns > 0 => Some(usize::from(columns)),
        _ => None,
    }
}

/// Columns `text` occupies on screen.  ANSI CSI sequences take no room.
pub(crate) fn display_width(text: &str) -> usize {
    let mut width = 0;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.next() == Some('[') {
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            continue;
        }
        width += c.width().unwrap_or(0);
    }
    width
}

/// Renders Markdown with ANSI styling and word wrapping.
#[derive(Debug, Clone, Copy)]
pub struct TerminalMarkdown {
    style: MarkdownStyle,
    width: usize,
}

impl TerminalMarkdown {
    /// Wraps at the terminal width, capped at 100 columns.
    pub fn new(style: MarkdownStyle) -> Self {
        let width = terminal_columns()
            .map(|columns| columns.clamp(MIN_WIDTH, DEFAULT_WIDTH))
            .unwrap_or(DEFAULT_WIDTH);
        Self { style, width }
    }

    /// A renderer using the style named by `GEMI_STYLE`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(MarkdownStyle::from_env()?))
    }

    /// Wrap paragraphs at `width` columns.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(MIN_WIDTH);
        self
    }

    pub fn style(&self) -> MarkdownStyle {
        self.style
    }
}

impl Default for TerminalMarkdown {
    fn default() -> Self {
        Self::new(MarkdownStyle::default())
    }
}

impl MarkdownRenderer for TerminalMarkdown {
    fn render(&self, markdown: &str) -> Result<String> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut writer = Writer::new(self.style.palette(), self.width);
        for event in Parser::new_ext(markdown, options) {
            writer.event(event);
        }
        Ok(writer.finish())
    }
}

/// What an `End` event closes.
enum Open {
    Paragraph,
    Heading,
    Quote,
    CodeBlock,
    List,
    Item,
    Style,
    Link,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Other,
}

struct ListState {
    next: Option<u64>,
    hang: usize,
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
    header_rows: usize,
}

struct Writer {
    palette: Option<&'static Palette>,
    width: usize,
    out: String,
    line: String,
    col: usize,
    line_open: bool,
    has_content: bool,
    space: bool,
    styles: Vec<&'static str>,
    open: Vec<Open>,
    lists: Vec<ListState>,
    marker: Option<String>,
    quote_depth: usize,
    code_block: bool,
    links: Vec<(String, String)>,
    table: Option<TableState>,
}

impl Writer {
    fn new(palette: Option<&'static Palette>, width: usize) -> Self {
        Self {
            palette,
            width,
            out: String::new(),
            line: String::new(),
            col: 0,
            line_open: false,
            has_content: false,
            space: false,
            styles: Vec::new(),
            open: Vec::new(),
            lists: Vec::new(),
            marker: None,
            quote_depth: 0,
            code_block: false,
            links: Vec::new(),
            table: None,
        }
    }

    fn color(&self, pick: fn(&Palette) -> &'static str) -> &'static str {
        self.palette.map(pick).unwrap_or("")
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.push_str(&code);
                    return;
                }
                if let Some((_, text)) = self.links.last_mut() {
                    text.push_str(&code);
                }
                let style = self.color(|p| p.code);
                self.styled_word(&code, style);
            }
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::FootnoteReference(name) => self.word(&format!("[^{name}]")),
            Event::SoftBreak => self.space = true,
            Event::HardBreak => self.break_line(),
            Event::Rule => self.rule(),
            Event::TaskListMarker(checked) => {
                self.word(if checked { "[x]" } else { "[ ]" });
                self.space = true;
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let open = match tag {
            Tag::Paragraph => {
                self.break_line();
                Open::Paragraph
            }
            Tag::Heading { level, .. } => {
                self.break_line();
                let style = self.color(|p| p.heading);
                self.push_style(style);
                let depth = heading_depth(level);
                if depth > 1 {
                    self.word(&"#".repeat(depth));
                    self.space = true;
                }
                Open::Heading
            }
            Tag::BlockQuote { .. } => {
                self.break_line();
                self.quote_depth += 1;
                Open::Quote
            }
            Tag::CodeBlock(kind) => {
                self.break_line();
                if let CodeBlockKind::Fenced(lang) = &kind {
                    if !lang.is_empty() {
                        let style = self.color(|p| p.quote);
                        self.styled_word(lang, style);
                        self.break_line();
                    }
                }
                self.code_block = true;
                Open::CodeBlock
            }
            Tag::List(start) => {
                self.break_line();
                self.lists.push(ListState {
                    next: start,
                    hang: 2,
                });
                Open::List
            }
            Tag::Item => {
                self.break_line();
                let marker = match self.lists.last_mut() {
                    Some(ListState {
                        next: Some(n),
                        hang,
                    }) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        *hang = marker.width();
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.marker = Some(marker);
                Open::Item
            }
            Tag::Emphasis => {
                self.push_style(ITALIC);
                Open::Style
            }
            Tag::Strong => {
                self.push_style(BOLD);
                Open::Style
            }
            Tag::Strikethrough => {
                self.push_style(STRIKE);
                Open::Style
            }
            Tag::Link { dest_url, .. } => {
                self.links.push((dest_url.to_string(), String::new()));
                let style = self.color(|p| p.link);
                self.push_style(style);
                Open::Link
            }
            Tag::Table(_) => {
                self.break_line();
                self.table = Some(TableState::default());
                Open::Table
            }
            Tag::TableHead => Open::TableHead,
            Tag::TableRow => Open::TableRow,
            Tag::TableCell => Open::TableCell,
            _ => Open::Other,
        };
        self.open.push(open);
    }

    fn end(&mut self) {
        let Some(open) = self.open.pop() else {
            return;
        };
        match open {
            Open::Paragraph => {
                self.break_line();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            Open::Heading => {
                self.pop_style();
                self.break_line();
                self.blank_line();
            }
            Open::Quote => {
                self.break_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank_line();
            }
            Open::CodeBlock => {
                self.break_line();
                self.code_block = false;
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            Open::List => {
                self.break_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            Open::Item => {
                self.break_line();
                self.marker = None;
            }
            Open::Style => self.pop_style(),
            Open::Link => {
                self.pop_style();
                if let Some((dest, text)) = self.links.pop() {
                    if !dest.is_empty() && dest != text {
                        self.space = true;
                        let style = self.color(|p| p.quote);
                        self.styled_word(&format!("({dest})"), style);
                    }
                }
            }
            Open::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            Open::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                    table.header_rows = table.rows.len();
                }
            }
            Open::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            Open::Table => {
                if let Some(table) = self.table.take() {
                    self.write_table(table);
                }
                self.blank_line();
            }
            Open::Other => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(text);
            return;
        }
        if self.code_block {
            self.code_text(text);
            return;
        }
        if let Some((_, link_text)) = self.links.last_mut() {
            link_text.push_str(text);
        }
        for (i, word) in text.split([' ', '\t', '\n']).enumerate() {
            if i > 0 {
                self.space = true;
            }
            if !word.is_empty() {
                self.word(word);
            }
        }
    }

    fn code_text(&mut self, text: &str) {
        let style = self.color(|p| p.code_block);
        for segment in text.split_inclusive('\n') {
            let (body, newline) = match segment.strip_suffix('\n') {
                Some(body) => (body, true),
                None => (segment, false),
            };
            self.ensure_prefix();
            if !self.has_content {
                self.line.push_str("  ");
                self.col += 2;
                self.has_content = true;
            }
            self.push_colored(style, body);
            self.col += body.width();
            if newline {
                self.break_line();
            }
        }
    }

    fn word(&mut self, word: &str) {
        self.place(word.width());
        self.line.push_str(word);
    }

    fn styled_word(&mut self, word: &str, style: &'static str) {
        self.place(word.width());
        self.push_colored(style, word);
    }

    /// Make room for a word of `width` columns, wrapping if needed.
    fn place(&mut self, width: usize) {
        let gap = usize::from(self.space && self.has_content);
        if self.has_content && self.col + gap + width > self.width {
            self.break_line();
        }
        self.ensure_prefix();
        if self.space && self.has_content {
            self.line.push(' ');
            self.col += 1;
        }
        self.space = false;
        self.col += width;
        self.has_content = true;
    }

    fn push_colored(&mut self, style: &'static str, text: &str) {
        if style.is_empty() {
            self.line.push_str(text);
            return;
        }
        self.line.push_str(style);
        self.line.push_str(text);
        self.line.push_str(RESET);
        self.reapply_styles();
    }

    fn push_style(&mut self, style: &'static str) {
        self.styles.push(style);
        if self.line_open && self.palette.is_some() {
            self.line.push_str(style);
        }
    }

    fn pop_style(&mut self) {
        self.styles.pop();
        if self.line_open && self.palette.is_some() {
            self.line.push_str(RESET);
            self.reapply_styles();
        }
    }

    fn reapply_styles(&mut self) {
        if self.palette.is_none() {
            return;
        }
        for style in &self.styles {
            self.line.push_str(style);
        }
    }

    fn ensure_prefix(&mut self) {
        if self.line_open {
            return;
        }
        self.line_open = true;
        self.has_content = false;
        self.col = 0;

        if self.quote_depth > 0 {
            let bar = "│ ".repeat(self.quote_depth);
            self.col += bar.width();
            let style = self.color(|p| p.quote);
            self.push_colored(style, &bar);
        }

        let depth = self.lists.len();
        let outer: usize = self
            .lists
            .iter()
            .take(depth.saturating_sub(1))
            .map(|list| list.hang)
            .sum();
        match self.marker.take() {
            Some(marker) => {
                self.line.push_str(&" ".repeat(outer));
                self.col += outer + marker.width();
                let style = self.color(|p| p.bullet);
                self.push_colored(style, &marker);
            }
            None => {
                let hang = self.lists.last().map(|list| list.hang).unwrap_or(0);
                self.line.push_str(&" ".repeat(outer + hang));
                self.col += outer + hang;
            }
        }
        self.reapply_styles();
    }

    fn break_line(&mut self) {
        if !self.line_open {
            return;
        }
        if self.palette.is_some() && !self.styles.is_empty() {
            self.line.push_str(RESET);
        }
        self.out.push_str(self.line.trim_end_matches(' '));
        self.out.push('\n');
        self.line.clear();
        self.line_open = false;
        self.has_content = false;
        self.space = false;
        self.col = 0;
    }

    fn blank_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn rule(&mut self) {
        self.break_line();
        self.ensure_prefix();
        let len = self.width.saturating_sub(self.col).min(40);
        let style = self.color(|p| p.rule);
        self.push_colored(style, &"─".repeat(len));
        self.has_content = true;
        self.break_line();
        self.blank_line();
    }

    fn write_table(&mut self, table: TableState) {
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; columns];
        for row in &table.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        for (r, row) in table.rows.iter().enumerate() {
            self.ensure_prefix();
            let header = r < table.header_rows;
            for (i, width) in widths.iter().enumerate() {
                if i > 0 {
                    self.line.push_str(" │ ");
                }
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let mut padded = cell.to_string();
                padded.push_str(&" ".repeat(width.saturating_sub(cell.width())));
                if header {
                    self.push_colored(if self.palette.is_some() { BOLD } else { "" }, &padded);
                } else {
                    self.line.push_str(&padded);
                }
            }
            self.has_content = true;
            self.break_line();
            if header && r + 1 == table.header_rows {
                self.ensure_prefix();
                let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
                self.line.push_str(&separator.join("─┼─"));
                self.has_content = true;
                self.break_line();
            }
        }
    }

    fn finish(mut self) -> String {
        self.break_line();
        let trimmed = self.out.trim_end_matches('\n').len();
        self.out.truncate(trimmed);
        self.out
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
