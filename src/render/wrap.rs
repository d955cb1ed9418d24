//! Word wrapping for fixed-width fonts.
//!
//! All faces are monospace, so wrapping measures in characters rather than
//! pixels; the caller converts the printable pixel width into a character
//! budget once per render.

/// Wrap a single paragraph into lines of at most `max_chars` characters.
///
/// Words are never split: a line takes as many whole words as fit, and a
/// single word wider than the budget is emitted alone on its own line
/// (overflowing rather than breaking mid-word).
///
/// An empty or whitespace-only paragraph yields one empty line so vertical
/// spacing is preserved.
pub fn wrap_line(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed <= max_chars {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else if current.is_empty() {
            // Oversized word on an otherwise empty line: emit it alone.
            lines.push(word.to_string());
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Wrap multi-line content: paragraphs are split on `\n` and wrapped
/// independently, so explicit line structure survives.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    text.split('\n')
        .flat_map(|paragraph| wrap_line(paragraph, max_chars))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
