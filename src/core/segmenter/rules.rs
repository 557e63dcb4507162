//! Named tokenizer rules for reply segmentation.
//!
//! Each rule looks at the head of the pending buffer and reports how many
//! bytes it would consume. The segmenter applies them in priority order:
//!
//! 1. [`Rule::TagToken`] at the very head (`[happy]`)
//! 2. [`Rule::SentenceTerminal`] (first terminal run, any script)
//! 3. [`Rule::TagBoundary`] (a well-formed tag after buffered text)
//! 4. [`Rule::CommaThreshold`] (comma after at least N chars)
//!
//! A comma clause that closes before a tag boundary is emitted ahead of it.

use crate::core::emotion::{EmotionTag, MAX_TAG_LEN};

// =============================================================================
// Character classes
// =============================================================================

/// Characters that end a sentence.
pub const SENTENCE_TERMINALS: &[char] = &['.', '!', '?', '。', '．', '！', '？', '\n'];

/// Characters that end a clause for the comma-threshold rule.
pub const COMMA_CLASS: &[char] = &[',', '、', '，', ';', '；'];

/// Closing brackets and quotes that stay attached to a terminal run.
pub const CLOSING_MARKS: &[char] = &[
    '"', '\'', '”', '’', '」', '』', '）', ')', ']', '】', '》', '〉', '»', '›', '〕', '｝', '}',
    '］', '〙', '〛',
];

/// Bracket and quote characters that carry no speech on their own.
pub const BRACKETS_AND_QUOTES: &[char] = &[
    '[', '(', '{', '「', '［', '（', '【', '『', '〈', '《', '〔', '｛', '«', '‹', '〘', '〚', '〛',
    '〙', '›', '»', '〕', '》', '〉', '』', '】', '）', '］', '」', '}', ')', ']', '"', '\'', '“',
    '”', '‘', '’',
];

/// Non-ASCII punctuation treated as non-speakable.
const WIDE_PUNCTUATION: &[char] = &[
    '。', '．', '！', '？', '、', '，', '；', '：', '…', '‥', '・', '〜', '～', '—', '–', '·', '¡',
    '¿',
];

#[inline]
pub fn is_terminal(c: char) -> bool {
    SENTENCE_TERMINALS.contains(&c)
}

#[inline]
pub fn is_comma(c: char) -> bool {
    COMMA_CLASS.contains(&c)
}

#[inline]
fn extends_terminal_run(c: char) -> bool {
    is_terminal(c) || c == '…' || CLOSING_MARKS.contains(&c)
}

/// Returns whether `text` contains anything a synthesizer could pronounce.
///
/// ```rust
/// use voxchat::core::segmenter::is_speakable;
///
/// assert!(is_speakable("「はい」"));
/// assert!(!is_speakable("..."));
/// assert!(!is_speakable(" 」"));
/// ```
pub fn is_speakable(text: &str) -> bool {
    text.chars().any(|c| {
        !c.is_whitespace()
            && !c.is_ascii_punctuation()
            && !BRACKETS_AND_QUOTES.contains(&c)
            && !WIDE_PUNCTUATION.contains(&c)
    })
}

// =============================================================================
// Rules
// =============================================================================

/// The rule that produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// `[tag]` at the head of the buffer.
    TagToken,
    /// Text up to and including a sentence terminal run.
    SentenceTerminal,
    /// Text preceding a well-formed tag found mid-buffer.
    TagBoundary,
    /// Long enough text up to and including a comma.
    CommaThreshold,
}

impl Rule {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Rule::TagToken => "tag_token",
            Rule::SentenceTerminal => "sentence_terminal",
            Rule::TagBoundary => "tag_boundary",
            Rule::CommaThreshold => "comma_threshold",
        }
    }
}

/// Result of scanning the head of the buffer for a tag token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagScan {
    /// A complete tag token of `len` bytes.
    Tag { tag: EmotionTag, len: usize },
    /// Looks like the start of a tag but the closing bracket has not arrived.
    Incomplete,
    /// Not a tag; the bracket is literal text.
    NotTag,
}

/// Rule 1: match a `[tag]` token at the start of `buf`.
pub fn scan_tag_token(buf: &str) -> TagScan {
    let Some(rest) = buf.strip_prefix('[') else {
        return TagScan::NotTag;
    };

    for (count, (i, c)) in rest.char_indices().enumerate() {
        if c == ']' {
            let body = &rest[..i];
            return if EmotionTag::is_tag_body(body) {
                TagScan::Tag {
                    tag: EmotionTag::parse(body),
                    len: i + 2,
                }
            } else {
                TagScan::NotTag
            };
        }
        if count >= MAX_TAG_LEN || !(c.is_alphabetic() || c == '_' || c == '-') {
            return TagScan::NotTag;
        }
    }

    TagScan::Incomplete
}

/// Outcome of one tokenizer step over the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A tag token to consume and make pending.
    Tag { tag: EmotionTag, len: usize },
    /// A text unit ending at byte `len`.
    Unit { rule: Rule, len: usize },
    /// Nothing can be decided until more text arrives.
    NeedMore,
}

/// Rule 2: find the end of the first sentence terminal run.
///
/// Returns `Some(Ok(end))` for a complete run, `Some(Err(()))` when the run
/// touches the end of the buffer on a `.` and could still turn into a decimal
/// number or an ellipsis, and `None` when no terminal is present.
fn terminal_run_end(buf: &str, start: usize, c: char, prev: Option<char>) -> Option<Result<usize, ()>> {
    let after = start + c.len_utf8();
    let next = buf[after..].chars().next();

    if c == '.' && prev.is_some_and(|p| p.is_ascii_digit()) {
        match next {
            Some(n) if n.is_ascii_digit() => return None,
            None => return Some(Err(())),
            _ => {}
        }
    }

    let mut end = after;
    let mut last = c;
    for ch in buf[after..].chars() {
        if !extends_terminal_run(ch) {
            return Some(Ok(end));
        }
        end += ch.len_utf8();
        last = ch;
    }

    if last == '.' {
        Some(Err(()))
    } else {
        Some(Ok(end))
    }
}

/// Run all rules over `buf` and return the first token.
///
/// `buf` is expected to have no leading whitespace.
pub fn next_token(buf: &str, comma_threshold: usize) -> Token {
    match scan_tag_token(buf) {
        TagScan::Tag { tag, len } => return Token::Tag { tag, len },
        TagScan::Incomplete => return Token::NeedMore,
        TagScan::NotTag => {}
    }

    let mut comma_end = None;
    let mut prev = None;

    for (count, (i, c)) in buf.char_indices().enumerate() {
        if is_terminal(c) {
            match terminal_run_end(buf, i, c, prev) {
                Some(Ok(len)) => {
                    return Token::Unit {
                        rule: Rule::SentenceTerminal,
                        len,
                    };
                }
                Some(Err(())) => return Token::NeedMore,
                None => {}
            }
        } else if c == '[' && i > 0 {
            if let TagScan::Tag { .. } = scan_tag_token(&buf[i..]) {
                // A clause already closed by a comma goes out first.
                return match comma_end {
                    Some(len) => Token::Unit {
                        rule: Rule::CommaThreshold,
                        len,
                    },
                    None => Token::Unit {
                        rule: Rule::TagBoundary,
                        len: i,
                    },
                };
            }
        } else if comma_end.is_none() && is_comma(c) && count >= comma_threshold {
            comma_end = Some(i + c.len_utf8());
        }
        prev = Some(c);
    }

    match comma_end {
        Some(len) => Token::Unit {
            rule: Rule::CommaThreshold,
            len,
        },
        None => Token::NeedMore,
    }
}
