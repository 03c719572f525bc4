//! Pure text transforms applied to a captured tail before it is classified or
//! summarized.
//!
//! The agent's TUI draws the prompt box as two `─` rule lines with the user's
//! unsent input between them. That region is not agent output, so it is cut
//! before anything else looks at the text.

use crate::patterns::RE_SEPARATOR;

/// Returns the last `max_chars` characters of `text` without splitting a
/// UTF-8 sequence.
pub fn last_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((index, _)) => &text[index..],
        None => text,
    }
}

/// Returns the last `count` lines of `text`.
pub fn last_lines(text: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].to_vec()
}

pub fn is_separator(line: &str) -> bool {
    RE_SEPARATOR.is_match(line.trim_end_matches(['\r', '\n']))
}

/// Drops everything from the second-to-last separator line onward.
///
/// With fewer than two separators there is no complete input box in view and
/// the text is returned unchanged.
pub fn strip_input_region(text: &str) -> &str {
    let mut separator_offsets = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if is_separator(line) {
            separator_offsets.push(offset);
        }
        offset += line.len();
    }

    if separator_offsets.len() < 2 {
        return text;
    }
    &text[..separator_offsets[separator_offsets.len() - 2]]
}

/// Removes the most recent user-authored paragraph: the last line starting
/// with `>` through the next blank line, or through the end of the text.
pub fn strip_previous_instruction(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines.iter().rposition(|line| line.starts_with('>')) else {
        return text.to_string();
    };

    let end = lines[start + 1..]
        .iter()
        .position(|line| line.trim().is_empty())
        .map(|relative| start + 1 + relative + 1)
        .unwrap_or(lines.len());

    lines[..start]
        .iter()
        .chain(lines[end..].iter())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

/// The text handed to a summarizer: agent narrative only, bounded in size.
pub fn shape_for_summary(tail: &str, max_chars: usize) -> String {
    let without_input = strip_input_region(tail);
    let without_instruction = strip_previous_instruction(without_input);
    last_chars(&without_instruction, max_chars).to_string()
}
