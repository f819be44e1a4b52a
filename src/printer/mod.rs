//! Report output: section headers and markdown rendering (termimad).

use owo_colors::OwoColorize;
use termimad::MadSkin;

/// Print a bold colored section header, as the report surface between
/// stages.
pub fn section(title: &str) {
    println!("\n{}", title.cyan().bold());
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    /// Render markdown to the terminal; falls back to plain text for
    /// content termimad does not understand.
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}
