//! Action protocol: line-oriented text to [`Action`] values.
//!
//! Each line is trimmed and matched, ASCII case-insensitively, against the
//! first keyword prefix it starts with:
//!
//! ```text
//! SEND_PUBLIC: <message>
//! SEND_PRIVATE: <name>: <message>
//! SOLVE: <puzzle_id> <answer>
//! TRADE: <name> offer=<tokens> for=<ask>
//! ACCEPT_TRADE: <trade_id>
//! SHOUT: <message>
//! RATE: <name> helpful|neutral|unhelpful
//! PASS
//! ```
//!
//! Lines that do not parse are dropped. A reply with no parseable line is a
//! single [`Action::Pass`], and at most [`MAX_ACTIONS_PER_ROUND`] actions are
//! kept.
//!
//! [`scan_for_exploits`] looks for the same keywords inside free text. It
//! only reports; it never changes what was parsed.

use std::num::NonZeroU64;

use terrarium_types::{Action, MAX_ACTIONS_PER_ROUND, PuzzleId, Rating, TradeId};
use tracing::debug;

/// Keywords whose `KEYWORD:` form inside free text counts as an injection.
const INJECTION_KEYWORDS: [&str; 7] = [
    "SEND_PRIVATE",
    "SEND_PUBLIC",
    "SOLVE",
    "TRADE",
    "ACCEPT_TRADE",
    "PASS",
    "RATE",
];

/// Longest prefix of exploit text kept in the event log, in characters.
pub const EXPLOIT_TEXT_LIMIT: usize = 300;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a controller reply into at most two actions.
pub fn parse_actions(raw: &str) -> Vec<Action> {
    let mut actions: Vec<Action> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parsed = parse_line(line);
            if parsed.is_none() {
                debug!(line, "Dropping unparseable action line");
            }
            parsed
        })
        .collect();
    if actions.is_empty() {
        actions.push(Action::Pass);
    }
    actions.truncate(MAX_ACTIONS_PER_ROUND);
    actions
}

/// Parse one trimmed, non-empty line.
fn parse_line(line: &str) -> Option<Action> {
    if let Some(rest) = strip_keyword(line, "SEND_PUBLIC:") {
        return non_empty(rest).map(|message| Action::SendPublic {
            message: message.to_owned(),
        });
    }
    if let Some(rest) = strip_keyword(line, "SEND_PRIVATE:") {
        return parse_private(rest.trim());
    }
    if let Some(rest) = strip_keyword(line, "SOLVE:") {
        let (puzzle_id, answer) = split_first_word(rest.trim())?;
        return Some(Action::Solve {
            puzzle_id: PuzzleId::new(puzzle_id),
            answer: answer.to_owned(),
        });
    }
    if let Some(rest) = strip_keyword(line, "TRADE:") {
        return parse_trade(rest.trim());
    }
    if let Some(rest) = strip_keyword(line, "ACCEPT_TRADE:") {
        let trade_id = rest.split_whitespace().next()?;
        return Some(Action::AcceptTrade {
            trade_id: TradeId::new(trade_id),
        });
    }
    if let Some(rest) = strip_keyword(line, "SHOUT:") {
        return non_empty(rest).map(|message| Action::Shout {
            message: message.to_owned(),
        });
    }
    if let Some(rest) = strip_keyword(line, "RATE:") {
        let (target, rating) = split_first_word(rest.trim())?;
        let rating = Rating::from_word(&rating.to_lowercase())?;
        return Some(Action::Rate {
            target: target.to_owned(),
            rating,
        });
    }
    strip_keyword(line, "PASS").map(|_| Action::Pass)
}

/// `<name>: <message>` with a word-character name.
fn parse_private(rest: &str) -> Option<Action> {
    let (target, after) = take_word(rest)?;
    let after = after.trim_start().strip_prefix(':')?;
    let message = non_empty(after)?;
    Some(Action::SendPrivate {
        target: target.to_owned(),
        message: message.to_owned(),
    })
}

/// `<name> offer=<digits> for=<ask>`; keys match case-insensitively.
fn parse_trade(rest: &str) -> Option<Action> {
    let (target, after) = take_word(rest)?;
    let after = require_whitespace(after)?;
    let after = strip_keyword(after, "offer=")?;
    let digits_end = after
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after.len());
    let (digits, after) = after.split_at(digits_end);
    let after = require_whitespace(after)?;
    let ask = non_empty(strip_keyword(after, "for=")?)?;
    let offer = digits.parse::<u64>().ok().and_then(NonZeroU64::new)?;
    Some(Action::Trade {
        target: target.to_owned(),
        offer,
        ask: ask.to_owned(),
    })
}

/// Strip `keyword` from the start of `text`, ignoring ASCII case.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| text.get(keyword.len()..))
        .flatten()
}

/// Leading run of word characters and the remainder. `None` if empty.
fn take_word(text: &str) -> Option<(&str, &str)> {
    let end = text
        .find(|c: char| !is_word_char(c))
        .unwrap_or(text.len());
    (end > 0).then(|| text.split_at(end))
}

/// Require at least one whitespace character, then skip all of it.
fn require_whitespace(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    (trimmed.len() < text.len()).then_some(trimmed)
}

/// First whitespace-separated word and the trimmed remainder, both non-empty.
fn split_first_word(text: &str) -> Option<(&str, &str)> {
    let (first, rest) = text.split_once(char::is_whitespace)?;
    non_empty(rest).map(|rest| (first, rest))
}

fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// ---------------------------------------------------------------------------
// Exploit scanning
// ---------------------------------------------------------------------------

/// Find protocol keywords followed by a colon inside free text.
///
/// Matching is ASCII case-insensitive and ignores word boundaries. Matches
/// do not overlap and are returned as written, including any whitespace
/// before the colon.
pub fn scan_for_exploits(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut position = 0;
    while let Some(rest) = text.get(position..) {
        let Some(first) = rest.chars().next() else {
            break;
        };
        if let Some(length) = injection_at(rest) {
            if let Some(matched) = rest.get(..length) {
                found.push(matched.to_owned());
            }
            position = position.saturating_add(length);
        } else {
            position = position.saturating_add(first.len_utf8());
        }
    }
    found
}

/// Length of an injection match at the start of `text`, if any.
fn injection_at(text: &str) -> Option<usize> {
    INJECTION_KEYWORDS.iter().find_map(|keyword| {
        let after = strip_keyword(text, keyword)?;
        let spaced = after.trim_start();
        spaced
            .starts_with(':')
            .then(|| text.len().saturating_sub(spaced.len()).saturating_add(1))
    })
}

/// The first [`EXPLOIT_TEXT_LIMIT`] characters of `text`.
pub fn exploit_excerpt(text: &str) -> String {
    text.chars().take(EXPLOIT_TEXT_LIMIT).collect()
}
