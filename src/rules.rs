//! Secret patterns and the replacement logic applied to each blob.
//!
//! A [`RuleSet`] is an ordered list of regex rules plus an allow-list of
//! filename suffixes. Rules are chained: each one runs a global
//! substitution over the output of the one before it, so a rule can match
//! text an earlier rule produced.
//!
//! Patterns are compiled with `regex` here but executed by Python's `re`
//! inside git-filter-repo, so they must stay in the syntax both agree on.

use std::borrow::Cow;

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

/// Filename suffixes whose contents are scrubbed by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".ts",
    ".js",
    ".tsx",
    ".jsx",
    ".json",
    ".env",
    ".env.example",
];

/// A single pattern and the literal token that replaces its matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Regular expression to search for
    pub pattern: String,

    /// Literal text substituted for every match (no `$` expansion)
    pub replacement: String,
}

impl RuleEntry {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    /// Rules for well-known vendor key formats.
    ///
    /// The more specific Stripe prefixes come before the bare `sk_` rule so
    /// live and test keys get their own tokens.
    pub fn builtin() -> Vec<RuleEntry> {
        vec![
            RuleEntry::new("sk_live_[a-zA-Z0-9]{24}", "STRIPE_SECRET_KEY"),
            RuleEntry::new("sk_test_[a-zA-Z0-9]{24}", "STRIPE_TEST_KEY"),
            RuleEntry::new("sk_[a-zA-Z0-9]{24}", "STRIPE_API_KEY"),
            RuleEntry::new("sk-[a-zA-Z0-9]{48}", "OPENAI_API_KEY"),
            RuleEntry::new("hf_[a-zA-Z0-9]{39}", "HUGGINGFACE_TOKEN"),
        ]
    }

    /// Catch-all for any long alphanumeric run.
    ///
    /// This also hits commit hashes, lockfile integrity values and long
    /// identifiers, which is why it can be switched off.
    pub fn generic() -> RuleEntry {
        RuleEntry::new("[a-zA-Z0-9]{32,}", "API_KEY")
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    entry: RuleEntry,
    regex: Regex,
}

/// Ordered, compiled rules plus the filename allow-list.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    extensions: Vec<String>,
}

impl RuleSet {
    /// Compile `entries` in order. Fails on the first invalid pattern.
    pub fn new(entries: Vec<RuleEntry>, extensions: Vec<String>) -> Result<Self, Error> {
        let rules = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                if let Some(construct) = python_incompatible(&entry.pattern) {
                    return Err(Error::UnsupportedSyntax {
                        index,
                        pattern: entry.pattern.clone(),
                        construct,
                    });
                }
                let regex = Regex::new(&entry.pattern).map_err(|source| Error::InvalidPattern {
                    index,
                    pattern: entry.pattern.clone(),
                    source,
                })?;
                Ok(CompiledRule { entry, regex })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self { rules, extensions })
    }

    /// The built-in rules over the default extensions.
    pub fn builtin(include_generic: bool) -> Result<Self, Error> {
        let mut entries = RuleEntry::builtin();
        if include_generic {
            entries.push(RuleEntry::generic());
        }
        Self::new(
            entries,
            DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = &RuleEntry> {
        self.rules.iter().map(|r| &r.entry)
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether blobs named `filename` are rewritten at all.
    pub fn applies_to(&self, filename: &str) -> bool {
        self.extensions.iter().any(|ext| filename.ends_with(ext.as_str()))
    }

    /// Run every rule over `content`, in order.
    ///
    /// Content of files outside the allow-list is returned untouched.
    pub fn apply<'c>(&self, filename: &str, content: &'c str) -> Cow<'c, str> {
        if !self.applies_to(filename) {
            return Cow::Borrowed(content);
        }
        self.replace_all(content)
    }

    /// Run every rule over `content` regardless of filename.
    pub fn replace_all<'c>(&self, content: &'c str) -> Cow<'c, str> {
        let mut current = Cow::Borrowed(content);
        for rule in &self.rules {
            let replaced = match rule
                .regex
                .replace_all(&current, NoExpand(rule.entry.replacement.as_str()))
            {
                Cow::Borrowed(_) => continue,
                Cow::Owned(replaced) => replaced,
            };
            current = Cow::Owned(replaced);
        }
        current
    }

    /// Count matches per rule as they would occur during [`RuleSet::apply`].
    pub fn matches(&self, filename: &str, content: &str) -> Vec<(RuleEntry, usize)> {
        if !self.applies_to(filename) {
            return Vec::new();
        }

        let mut current = content.to_string();
        let mut counts = Vec::new();
        for rule in &self.rules {
            let count = rule.regex.find_iter(&current).count();
            if count > 0 {
                counts.push((rule.entry.clone(), count));
                current = rule
                    .regex
                    .replace_all(&current, NoExpand(rule.entry.replacement.as_str()))
                    .into_owned();
            }
        }
        counts
    }
}

/// Find regex syntax the `regex` crate accepts but Python's `re` rejects or
/// reads differently.
fn python_incompatible(pattern: &str) -> Option<&'static str> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut in_class = false;
    // Position just past the opening `[` (and `^`), where `]` is literal.
    let mut class_start = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\\' {
            match next {
                Some('p' | 'P') => return Some("Unicode class `\\p{..}`"),
                Some('z') => return Some("end-of-text `\\z`"),
                Some('<' | '>') => return Some("word boundary `\\<` / `\\>`"),
                Some('b' | 'B') if chars.get(i + 2) == Some(&'{') => {
                    return Some("word boundary `\\b{..}`");
                }
                _ => {}
            }
            i += 2;
            continue;
        }

        if in_class {
            match c {
                ']' if i > class_start => in_class = false,
                '[' if next == Some(':') => return Some("POSIX class `[[:name:]]`"),
                '[' => return Some("nested character class"),
                '&' | '-' | '~' if next == Some(c) => return Some("class set operation"),
                _ => {}
            }
        } else if c == '[' {
            in_class = true;
            class_start = if next == Some('^') { i + 2 } else { i + 1 };
            i = class_start;
            continue;
        } else if c == '(' && next == Some('?') {
            let flags = chars[i + 2..]
                .iter()
                .take_while(|f| f.is_ascii_alphabetic() || **f == '-');
            for f in flags {
                if matches!(f, 'U' | 'R') {
                    return Some("inline flag `U` / `R`");
                }
            }
        }
        i += 1;
    }
    None
}

/// Errors building a rule set.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("rule {index} has an invalid pattern `{pattern}`")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "rule {index} pattern `{pattern}` uses {construct}, \
         which git-filter-repo's Python regex does not support"
    )]
    UnsupportedSyntax {
        index: usize,
        pattern: String,
        construct: &'static str,
    },
}
