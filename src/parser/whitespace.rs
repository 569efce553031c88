//! Whitespace control over the token stream.
//!
//! Every text token has two sides. The left side is governed by the directive
//! before it, the right side by the directive after it:
//!
//! | Neighbour                                   | Removed from that side                        |
//! |---------------------------------------------|-----------------------------------------------|
//! | trim marker facing the text (`-%}`, `{%-`)  | all contiguous whitespace, across newlines    |
//! | `{% %}` tag, global stripping enabled       | spaces/tabs plus one line terminator (after a tag), or spaces/tabs back to the line start (before a tag) |
//! | anything else                               | nothing                                       |
//!
//! Output directives `{{ }}` only ever strip through explicit markers. Both
//! sides are measured on the original text and the surviving slice is their
//! intersection; a text token that loses everything is dropped.

use super::lexer::Token;

/// Apply trim markers and global stripping to `tokens`.
pub fn apply<'s>(tokens: Vec<Token<'s>>, strip_space_around_tags: bool) -> Vec<Token<'s>> {
    let mut result = Vec::with_capacity(tokens.len());

    for index in 0..tokens.len() {
        let Token::Text(text) = tokens[index] else {
            result.push(tokens[index].clone());
            continue;
        };

        let before = index.checked_sub(1).map(|i| &tokens[i]);
        let after = tokens.get(index + 1);

        let start = match before {
            Some(token) if token.trim().right => text.len() - trim_all_start(text).len(),
            Some(token) if strip_space_around_tags && token.is_tag() => {
                text.len() - trim_line_start(text).len()
            }
            _ => 0,
        };
        let end = match after {
            Some(token) if token.trim().left => trim_all_end(text).len(),
            Some(token) if strip_space_around_tags && token.is_tag() => trim_line_end(text).len(),
            _ => text.len(),
        };

        if start < end {
            result.push(Token::Text(&text[start..end]));
        }
    }

    result
}

fn trim_all_start(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_ascii_whitespace())
}

fn trim_all_end(text: &str) -> &str {
    text.trim_end_matches(|c: char| c.is_ascii_whitespace())
}

/// Drop leading blanks and at most one line terminator.
fn trim_line_start(text: &str) -> &str {
    let rest = text.trim_start_matches([' ', '\t']);
    rest.strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .or_else(|| rest.strip_prefix('\r'))
        .unwrap_or(rest)
}

/// Drop trailing blanks back to, but not including, the previous terminator.
fn trim_line_end(text: &str) -> &str {
    text.trim_end_matches([' ', '\t'])
}
