//! Object pattern matching for granted permissions.
//!
//! Grants are written with wildcards and path parameters
//! (`/admin/users/:id`, `/admin/*`); requirements are always concrete paths.
//! Matching is directional: only the granted side is compiled into a
//! pattern, and the required side is compared as literal text.
//!
//! A compiled pattern is a sequence of tokens:
//!
//! | Source        | Token      | Matches                                  |
//! |---------------|------------|------------------------------------------|
//! | `*`           | `Wildcard` | any run of characters, `/` included      |
//! | `:name`       | `Param`    | one or more characters up to the next `/`|
//! | anything else | `Literal`  | itself, byte for byte                    |
//!
//! The whole required path must be consumed.

use crate::key::normalize_object_path;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Wildcard,
    Param(String),
}

/// A granted object path compiled for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPattern {
    source: String,
    matches_all: bool,
    /// Object patterns normalize the path they are matched against;
    /// route patterns compare it as given.
    normalizes: bool,
    tokens: Vec<Token>,
}

impl ObjectPattern {
    /// Normalize `granted` and split it into tokens.
    pub fn compile(granted: &str) -> Self {
        let source = normalize_object_path(granted);
        let matches_all = source == "*" || source == "/*";
        let tokens = if matches_all {
            Vec::new()
        } else {
            tokenize(&source)
        };
        Self {
            source,
            matches_all,
            normalizes: true,
            tokens,
        }
    }

    /// Compile a console route path such as `/users/:id`.
    ///
    /// Route paths are not API objects: neither the pattern nor the
    /// navigation target has the API prefix stripped.
    pub fn compile_route(path: &str) -> Self {
        Self {
            source: path.to_string(),
            matches_all: false,
            normalizes: false,
            tokens: tokenize(path),
        }
    }

    /// The normalized pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the `:name` parameters, in order of appearance.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Param(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// True if the normalized `required` path is covered by this pattern.
    pub fn matches(&self, required: &str) -> bool {
        if self.matches_all {
            return true;
        }
        if !self.normalizes {
            return match_tokens(&self.tokens, required.as_bytes());
        }
        let required = normalize_object_path(required);
        match_tokens(&self.tokens, required.as_bytes())
    }
}

/// Decide whether the `required` object path is covered by the `granted` pattern.
pub fn match_object(required: &str, granted: &str) -> bool {
    ObjectPattern::compile(granted).matches(required)
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '*' => {
                flush_literal(&mut literal, &mut tokens);
                // Consecutive stars collapse into one.
                if tokens.last() != Some(&Token::Wildcard) {
                    tokens.push(Token::Wildcard);
                }
            }
            ':' => {
                let rest = &pattern[idx + 1..];
                let name_len = rest.find('/').unwrap_or(rest.len());
                if name_len == 0 {
                    literal.push(':');
                    continue;
                }
                flush_literal(&mut literal, &mut tokens);
                tokens.push(Token::Param(rest[..name_len].to_string()));
                while chars.peek().is_some_and(|(i, _)| *i <= idx + name_len) {
                    chars.next();
                }
            }
            _ => literal.push(ch),
        }
    }
    flush_literal(&mut literal, &mut tokens);
    tokens
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

/// Walk the tokens once, tracking every input offset the prefix consumed so
/// far can end at. Each token costs at most one pass over the input, so a
/// grant with many wildcards stays linear in the path length.
fn match_tokens(tokens: &[Token], input: &[u8]) -> bool {
    let len = input.len();
    let mut reach = vec![false; len + 1];
    reach[0] = true;

    for token in tokens {
        let mut next = vec![false; len + 1];
        match token {
            Token::Literal(text) => {
                let text = text.as_bytes();
                for pos in (0..=len).filter(|&pos| reach[pos]) {
                    if input[pos..].starts_with(text) {
                        next[pos + text.len()] = true;
                    }
                }
            }
            Token::Wildcard => {
                if let Some(first) = reach.iter().position(|&r| r) {
                    next[first..].fill(true);
                }
            }
            Token::Param(_) => {
                // Once a segment is entered, every later offset within it
                // ends a non-empty parameter.
                let mut open = false;
                for (pos, &byte) in input.iter().enumerate() {
                    if byte == b'/' {
                        open = false;
                        continue;
                    }
                    open |= reach[pos];
                    if open {
                        next[pos + 1] = true;
                    }
                }
            }
        }
        if !next.contains(&true) {
            return false;
        }
        reach = next;
    }
    reach[len]
}
