//! Splitting a flat argument list into several command invocations
//!
//! A program that accepts `cmd1 args ; cmd2 args` receives one flat argument
//! vector. [`split_command`] breaks it back into one group per invocation,
//! with a [`Delim`] policy deciding how a delimiter glued to a word is treated.

use std::ops::{BitOr, BitOrAssign};

/// How delimiters attached to other words are handled.
///
/// Assuming the delimiter is `;`, these policies accept:
///
/// - [`Delim::STRICT`]: `cmd1 ; cmd2` (a standalone delimiter always works)
/// - [`Delim::TRAILING`]: `cmd1; cmd2`
/// - [`Delim::PRECEDING`]: `cmd1 ;cmd2`
/// - [`Delim::ANY`]: `cmd1;cmd2`
///
/// Policies combine with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Delim(u8);

impl Delim {
    pub const STRICT: Delim = Delim(0);
    pub const TRAILING: Delim = Delim(1);
    pub const PRECEDING: Delim = Delim(1 << 1);
    pub const ANY: Delim = Delim(1 << 2);

    #[must_use]
    pub fn is_strict(self) -> bool {
        self.0 == 0
    }

    /// True if any policy in `other` is enabled in `self`.
    #[must_use]
    pub fn intersects(self, other: Delim) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Delim {
    type Output = Delim;

    fn bitor(self, rhs: Delim) -> Delim {
        Delim(self.0 | rhs.0)
    }
}

impl BitOrAssign for Delim {
    fn bitor_assign(&mut self, rhs: Delim) {
        self.0 |= rhs.0;
    }
}

enum Word<'a> {
    Token(&'a str),
    Split,
}

struct Words<'a> {
    delim: &'a str,
    words: Vec<Word<'a>>,
}

impl<'a> Words<'a> {
    fn token(&mut self, token: &'a str) {
        if token == self.delim {
            self.words.push(Word::Split);
        } else {
            self.words.push(Word::Token(token));
        }
    }

    fn split(&mut self) {
        self.words.push(Word::Split);
    }
}

/// Split `args` into groups separated by `delim`.
///
/// A word equal to `delim` always separates groups. Depending on `policy`,
/// delimiters at the start, at the end or anywhere inside a word separate
/// groups as well. Empty groups are never returned, and an empty `delim`
/// leaves the arguments as a single group.
#[must_use]
pub fn split_command<S: AsRef<str>>(args: &[S], delim: &str, policy: Delim) -> Vec<Vec<String>> {
    if delim.is_empty() {
        let group: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        return if group.is_empty() { Vec::new() } else { vec![group] };
    }

    let mut words = Words {
        delim,
        words: Vec::with_capacity(args.len()),
    };
    for arg in args {
        let mut arg = arg.as_ref();
        if arg == delim || policy.is_strict() {
            words.token(arg);
            continue;
        }
        if policy.intersects(Delim::ANY) {
            for part in arg.split(delim) {
                if !part.is_empty() {
                    words.token(part);
                }
                words.split();
            }
            continue;
        }
        if policy.intersects(Delim::PRECEDING)
            && let Some(stripped) = arg.strip_prefix(delim)
        {
            words.split();
            arg = stripped;
        }
        if policy.intersects(Delim::TRAILING)
            && let Some(stripped) = arg.strip_suffix(delim)
        {
            words.token(stripped);
            words.split();
            continue;
        }
        words.token(arg);
    }

    let mut groups = Vec::new();
    let mut current = Vec::new();
    for word in words.words {
        match word {
            Word::Token(token) => current.push(token.to_string()),
            Word::Split => {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
