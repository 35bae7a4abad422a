//! Accumulates streamed text fragments while repainting them as Markdown.

use std::io::Write;
use std::sync::Arc;

use crate::markdown::{MarkdownRenderer, display_width, terminal_columns};
use crate::observability::{RENDER_FALLBACKS, RENDER_REPAINTS};
use crate::{Error, Result};

/// Collects the fragments of one streamed reply and keeps the terminal showing
/// the whole reply rendered as Markdown.
///
/// Each fragment re-renders the entire buffer, because later text can change
/// how earlier text renders (closing a code fence, finishing a table).  The
/// region drawn by the previous repaint is erased and drawn again; it is
/// measured in terminal rows, so a line wider than the terminal counts once
/// per row it wraps onto.  If rendering fails the raw buffer is drawn instead
/// and the stream goes on.
pub struct AccumulatingStream<W: Write> {
    buffer: String,
    markdown: Arc<dyn MarkdownRenderer>,
    out: W,
    columns: usize,
    drawn_rows: usize,
}

const FALLBACK_COLUMNS: usize = 80;

impl<W: Write> AccumulatingStream<W> {
    pub fn new(markdown: Arc<dyn MarkdownRenderer>, out: W) -> Self {
        Self {
            buffer: String::new(),
            markdown,
            out,
            columns: terminal_columns().unwrap_or(FALLBACK_COLUMNS),
            drawn_rows: 0,
        }
    }

    /// Measure repaints against a terminal `columns` wide.
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = columns.max(1);
        self
    }

    /// Appends `text` verbatim and repaints.
    pub fn on_fragment(&mut self, text: &str) -> Result<()> {
        self.buffer.push_str(text);
        let display = match self.markdown.render(&self.buffer) {
            Ok(rendered) => rendered,
            Err(err) => {
                RENDER_FALLBACKS.click();
                tracing::debug!(error = %err, "streaming render fell back to raw text");
                self.buffer.clone()
            }
        };
        self.repaint(&display)
    }

    /// Everything received so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Stops accepting fragments and returns the complete reply.
    ///
    /// The cursor is left on a fresh line below the drawn text.
    pub fn finish(mut self) -> Result<String> {
        if self.drawn_rows > 0 {
            writeln!(self.out).map_err(io_error)?;
            self.out.flush().map_err(io_error)?;
        }
        Ok(self.buffer)
    }

    fn repaint(&mut self, display: &str) -> Result<()> {
        let mut frame = String::from("\r");
        if self.drawn_rows > 1 {
            frame.push_str(&format!("\x1b[{}A", self.drawn_rows - 1));
        }
        frame.push_str("\x1b[J");
        frame.push_str(display);

        self.out.write_all(frame.as_bytes()).map_err(io_error)?;
        self.out.flush().map_err(io_error)?;
        self.drawn_rows = rows(display, self.columns);
        RENDER_REPAINTS.click();
        Ok(())
    }
}

/// Terminal rows `display` occupies when drawn from column zero.
fn rows(display: &str, columns: usize) -> usize {
    display
        .split('\n')
        .map(|line| display_width(line).div_ceil(columns).max(1))
        .sum()
}

fn io_error(err: std::io::Error) -> Error {
    Error::io("failed to write streamed output", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{MarkdownStyle, TerminalMarkdown};

    struct Broken;

    impl MarkdownRenderer for Broken {
        fn render(&self, _: &str) -> Result<String> {
            Err(Error::render("unsupported"))
        }
    }

    fn plain() -> Arc<dyn MarkdownRenderer> {
        Arc::new(TerminalMarkdown::new(MarkdownStyle::NoTty))
    }

    #[test]
    fn buffer_is_concatenation_of_fragments() {
        let fragments = ["# Ti", "tle\n\n", "some `co", "de` and ", "", "more\n", "```\nfn x"];
        let mut stream = AccumulatingStream::new(plain(), Vec::new());
        for fragment in fragments {
            stream.on_fragment(fragment).unwrap();
        }
        assert_eq!(stream.buffer(), fragments.concat());
        assert_eq!(stream.finish().unwrap(), fragments.concat());
    }

    #[test]
    fn repaint_erases_previous_region() {
        let mut out = Vec::new();
        {
            let mut stream = AccumulatingStream::new(plain(), &mut out).with_columns(80);
            stream.on_fragment("one").unwrap();
            stream.on_fragment("\n\ntwo").unwrap();
            stream.on_fragment(" three").unwrap();
            stream.finish().unwrap();
        }
        let out = String::from_utf8(out).unwrap();
        let frames: Vec<&str> = out.split('\r').skip(1).collect();
        assert_eq!(frames[0], "\x1b[Jone");
        assert_eq!(frames[1], "\x1b[Jone\n\ntwo");
        assert_eq!(frames[2], "\x1b[2A\x1b[Jone\n\ntwo three\n");
    }

    #[test]
    fn wide_lines_count_every_row() {
        let mut out = Vec::new();
        {
            let mut stream = AccumulatingStream::new(Arc::new(Broken), &mut out).with_columns(10);
            stream.on_fragment(&"x".repeat(25)).unwrap();
            stream.on_fragment("\n漢字漢字漢字").unwrap();
            stream.on_fragment("!").unwrap();
        }
        let out = String::from_utf8(out).unwrap();
        let frames: Vec<&str> = out.split('\r').skip(1).collect();
        // 25 columns wrap onto three rows.
        assert!(frames[1].starts_with("\x1b[2A\x1b[J"));
        // Six wide characters fill twelve columns, two more rows.
        assert!(frames[2].starts_with("\x1b[4A\x1b[J"));
    }

    #[test]
    fn row_counting_ignores_escapes() {
        assert_eq!(rows("\x1b[1mbold\x1b[0m", 4), 1);
        assert_eq!(rows("", 10), 1);
        assert_eq!(rows("abcd\nabcde", 4), 3);
    }

    #[test]
    fn render_failure_shows_raw_buffer() {
        let mut out = Vec::new();
        let mut stream = AccumulatingStream::new(Arc::new(Broken), &mut out);
        stream.on_fragment("**a").unwrap();
        stream.on_fragment("b**").unwrap();
        assert_eq!(stream.finish().unwrap(), "**ab**");
        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with("\x1b[J**ab**\n"));
    }

    #[test]
    fn empty_stream_draws_nothing() {
        let mut out = Vec::new();
        let stream = AccumulatingStream::new(plain(), &mut out);
        assert_eq!(stream.finish().unwrap(), "");
        assert!(out.is_empty());
    }
}
