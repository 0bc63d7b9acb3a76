//! Arena name canonicalization
//!
//! Server rotations duplicate arenas as numbered variants
//! ("Badlands Middle 2 [1v1 MGE]"); stats aggregation wants them folded into
//! one canonical "Map Part" form ("Badlands Middle").

/// Tokens dropped from arena names before canonicalization
const TOKEN_STRIP: [&str; 5] = ["1v1", "2v2", "mge", "tf2", "arena"];

/// Canonicalize an arena name to its "Map Part" form
///
/// Strips bracketed/parenthesized tags, filler tokens, and variant numbers,
/// maps known synonyms (`mid` -> `middle`), and Title Cases the result.
pub fn canonicalize_arena_name(original: &str) -> String {
    let mut s = strip_delimited(original, '[', ']');
    s = strip_delimited(&s, '(', ')');

    let mut kept: Vec<String> = Vec::new();
    for word in s.split_whitespace() {
        let lower = word.to_lowercase();
        if TOKEN_STRIP.contains(&lower.as_str()) {
            continue;
        }
        if lower.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let mapped = if lower == "mid" { "middle".to_string() } else { lower };
        kept.push(mapped);
    }

    let mut out = title_case(&kept.join(" "));

    // Trailing variant markers survive when glued to the last word
    if let Some(idx) = out.rfind(' ') {
        let tail = &out[idx + 1..];
        let is_number = tail.chars().all(|c| c.is_ascii_digit());
        let is_roman = !tail.is_empty()
            && tail.chars().all(|c| matches!(c, 'i' | 'v' | 'x' | 'I' | 'V' | 'X'));
        if is_number || is_roman {
            out.truncate(idx);
        }
    }
    out
}

/// Remove `open..close` delimited spans, keeping surrounding text
fn strip_delimited(input: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(input.len());
    let mut depth = 0usize;
    for c in input.chars() {
        if c == open {
            depth += 1;
            out.push(' ');
        } else if c == close {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            out.push(c);
        }
    }
    out
}

fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_bracketed_tags_and_numbers() {
        assert_eq!(
            canonicalize_arena_name("Badlands Middle 2 [1v1 MGE]"),
            "Badlands Middle"
        );
    }

    #[test]
    fn test_maps_mid_synonym() {
        assert_eq!(canonicalize_arena_name("badlands mid"), "Badlands Middle");
    }

    #[test]
    fn test_strips_filler_tokens() {
        assert_eq!(
            canonicalize_arena_name("granary middle tf2 arena"),
            "Granary Middle"
        );
    }

    #[test]
    fn test_strips_parenthesized_content() {
        assert_eq!(
            canonicalize_arena_name("Process Middle (classic)"),
            "Process Middle"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(canonicalize_arena_name(""), "");
    }
}
