//! Output rendering for the chat application.
//!
//! The [`Renderer`] trait decouples the session from the terminal; the
//! default [`PlainTextRenderer`] writes to stdout with optional ANSI styling.

use std::io::{self, Stdout, Write};

/// ANSI escape code for dim text (used for informational output).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for diagrams).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print a chunk of response text.
    ///
    /// This is called incrementally as fragments are streamed from the API.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Present a Mermaid diagram found in a completed response.
    fn print_diagram(&mut self, source: &str);

    /// Called when a response is complete.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Render into an arbitrary writer.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self { out, use_color }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    // Terminal write failures are not actionable mid-stream.
    fn emit(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_text(&mut self, text: &str) {
        self.emit(text);
    }

    fn print_error(&mut self, error: &str) {
        let line = self.styled(ANSI_RED, error);
        self.emit(&format!("\n{line}\n"));
    }

    fn print_info(&mut self, info: &str) {
        let line = self.styled(ANSI_DIM, info);
        self.emit(&format!("{line}\n"));
    }

    fn print_diagram(&mut self, source: &str) {
        let header = self.styled(ANSI_CYAN, "[mermaid diagram]");
        let body = self.styled(ANSI_CYAN, source.trim_end());
        self.emit(&format!("\n{header}\n{body}\n"));
    }

    fn finish_response(&mut self) {
        self.emit("\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.print_text("Hel");
        renderer.print_text("lo");
        renderer.finish_response();
        renderer.print_error("❌ boom");
        assert_eq!(
            String::from_utf8(renderer.into_inner()).unwrap(),
            "Hello\n\n❌ boom\n"
        );
    }

    #[test]
    fn diagram_is_styled() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), true);
        renderer.print_diagram("graph TD\n");
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.contains("\x1b[36m[mermaid diagram]\x1b[0m"));
        assert!(out.contains("graph TD\x1b[0m"));
    }
}
