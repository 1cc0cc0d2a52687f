/*!
 * ICU placeholder protection.
 *
 * Before a text goes to a provider, every top-level ICU argument (`{name}`,
 * `{count, number}`, whole `{count, plural, ...}` blocks) is replaced by an
 * opaque token `{xxN}` that translation engines leave alone. The original
 * arguments are put back into each translated text afterwards. ICU quoting
 * is honored: `'{...}'` is literal text and `''` is an escaped apostrophe.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{xx(\d+)\}").unwrap());

/// Text with its arguments replaced by tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedText {
    /// Text sent to providers
    pub text: String,
    /// (token, original argument) in order of appearance
    pub params: Vec<(String, String)>,
}

impl PreparedText {
    /// Put the original arguments back into a translated text
    ///
    /// Single pass, so a restored argument is never scanned for tokens again.
    /// Tokens without a recorded argument are left as they are.
    pub fn restore(&self, translated: &str) -> String {
        TOKEN
            .replace_all(translated, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.params.get(index))
                    .map(|(_, original)| original.clone())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }
}

/// Replace top-level ICU arguments with `{xxN}` tokens
pub fn replace_params(text: &str) -> PreparedText {
    let chars: Vec<char> = text.chars().collect();
    let mut output = String::with_capacity(text.len());
    let mut params = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\'' => {
                let end = quoted_end(&chars, i);
                output.extend(&chars[i..end]);
                i = end;
            }
            '{' => match matching_brace(&chars, i) {
                Some(close) => {
                    let token = format!("{{xx{}}}", params.len());
                    let original: String = chars[i..=close].iter().collect();
                    output.push_str(&token);
                    params.push((token, original));
                    i = close + 1;
                }
                None => {
                    output.extend(&chars[i..]);
                    break;
                }
            },
            c => {
                output.push(c);
                i += 1;
            }
        }
    }

    PreparedText {
        text: output,
        params,
    }
}

/// End (exclusive) of the apostrophe sequence starting at `start`
///
/// `''` is an escaped apostrophe, `'{` or `'}` opens a quoted literal that
/// runs to the next single apostrophe, anything else is a plain apostrophe.
fn quoted_end(chars: &[char], start: usize) -> usize {
    match chars.get(start + 1) {
        Some('\'') => start + 2,
        Some('{') | Some('}') => {
            let mut j = start + 1;
            while j < chars.len() {
                if chars[j] == '\'' {
                    if chars.get(j + 1) == Some(&'\'') {
                        j += 2;
                        continue;
                    }
                    return j + 1;
                }
                j += 1;
            }
            chars.len()
        }
        _ => start + 1,
    }
}

/// Index of the brace closing the one at `open`, skipping quoted text
fn matching_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = open;

    while j < chars.len() {
        match chars[j] {
            '\'' => {
                j = quoted_end(chars, j);
                continue;
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
        j += 1;
    }

    None
}
