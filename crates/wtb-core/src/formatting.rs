//! Reply text helpers: batch framing, splitting for Telegram limits.

use crate::{dispatcher::ExecutionResult, messaging::types::Keyboard};

/// `0x1234…abcd`-style shortening for buttons and lists.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

/// Combine per-command results into one reply.
///
/// One result is sent as-is. Several get a `"N commands processed"` header
/// and `"<i>. Line <n>:"` framing; only the last keyboard survives.
pub fn format_batch(results: Vec<ExecutionResult>) -> Option<(String, Option<Keyboard>)> {
    match results.len() {
        0 => None,
        1 => results.into_iter().next().map(|r| (r.message, r.keyboard)),
        n => {
            let mut keyboard = None;
            let mut blocks = vec![format!("{n} commands processed")];
            for (i, r) in results.into_iter().enumerate() {
                blocks.push(format!("{}. Line {}:\n{}", i + 1, r.source_line, r.message));
                if r.keyboard.is_some() {
                    keyboard = r.keyboard;
                }
            }
            Some((blocks.join("\n\n"), keyboard))
        }
    }
}

/// Split text into chunks of at most `limit` bytes, preferring line breaks.
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut chunk = String::new();
    for line in text.split_inclusive('\n') {
        if chunk.len() + line.len() > limit && !chunk.is_empty() {
            out.push(std::mem::take(&mut chunk));
        }
        let mut rest = line;
        while rest.len() > limit {
            let cut = floor_char_boundary(rest, limit);
            out.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        chunk.push_str(rest);
    }
    if !chunk.is_empty() {
        out.push(chunk);
    }
    out.into_iter()
        .map(|c| c.trim_end_matches('\n').to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut i = max.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    // A single char wider than `max` still has to go somewhere.
    if i == 0 {
        s.chars().next().map(char::len_utf8).unwrap_or(0)
    } else {
        i
    }
}
