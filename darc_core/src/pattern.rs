//! Ordered include/exclude path patterns.
//!
//! A pattern matches a path when the path lives under the pattern's directory,
//! or when the path's final component matches the pattern as a shell glob.
//! Lists are evaluated first-match-wins; a path no pattern matches is included.

use globset::{GlobBuilder, GlobMatcher};
use std::fmt;

/// Whether a matching pattern keeps or drops a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `--include PATTERN`
    Include,
    /// `--exclude PATTERN`
    Exclude,
}

impl PatternKind {
    /// Returns the flag-style name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Include => "include",
            PatternKind::Exclude => "exclude",
        }
    }
}

#[derive(Debug, Clone)]
enum NameMatcher {
    Glob(GlobMatcher),
    /// No file name can match, e.g. the pattern holds an empty class.
    Never,
}

/// A single include or exclude pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    kind: PatternKind,
    text: String,
    dir_prefix: String,
    name: NameMatcher,
}

impl Pattern {
    /// Create a pattern of the given kind.
    pub fn new(kind: PatternKind, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut dir_prefix = text.clone();
        if !dir_prefix.ends_with('/') {
            dir_prefix.push('/');
        }

        let name = match translate_glob(&text) {
            Some(glob) => match GlobBuilder::new(&glob)
                .literal_separator(true)
                .backslash_escape(false)
                .build()
            {
                Ok(glob) => NameMatcher::Glob(glob.compile_matcher()),
                Err(err) => {
                    log::warn!("pattern {:?} does not compile ({}), name part never matches", text, err);
                    NameMatcher::Never
                }
            },
            None => NameMatcher::Never,
        };

        Self {
            kind,
            text,
            dir_prefix,
            name,
        }
    }

    /// Create an include pattern.
    pub fn include(text: impl Into<String>) -> Self {
        Self::new(PatternKind::Include, text)
    }

    /// Create an exclude pattern.
    pub fn exclude(text: impl Into<String>) -> Self {
        Self::new(PatternKind::Exclude, text)
    }

    /// Include or exclude.
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// The pattern as given.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The pattern with a guaranteed trailing `/`.
    pub fn dir_prefix(&self) -> &str {
        &self.dir_prefix
    }

    /// Check whether `path` falls under this pattern.
    ///
    /// Both kinds use the same predicate; only [`exclude_path`] looks at the kind.
    pub fn matches(&self, path: &str) -> bool {
        let (dir, name) = split_path(path);

        let mut dir = dir.to_owned();
        dir.push('/');
        if dir.starts_with(&self.dir_prefix) {
            return true;
        }

        match &self.name {
            NameMatcher::Glob(glob) => glob.is_match(name),
            NameMatcher::Never => false,
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.as_str(), self.text)
    }
}

/// Ordered sequence of patterns, built in command-line flag order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternList {
    patterns: Vec<Pattern>,
}

impl PatternList {
    /// Create an empty list, which excludes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pattern; it ranks below every pattern already present.
    pub fn push(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when no patterns are configured.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate patterns in evaluation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }

    /// Patterns as a slice.
    pub fn as_slice(&self) -> &[Pattern] {
        &self.patterns
    }

    /// The first pattern matching `path`, if any.
    pub fn first_match(&self, path: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|pattern| pattern.matches(path))
    }

    /// Decide whether `path` should be skipped.
    pub fn excludes(&self, path: &str) -> bool {
        exclude_path(path, &self.patterns)
    }
}

impl FromIterator<Pattern> for PatternList {
    fn from_iter<I: IntoIterator<Item = Pattern>>(iter: I) -> Self {
        Self {
            patterns: iter.into_iter().collect(),
        }
    }
}

impl Extend<Pattern> for PatternList {
    fn extend<I: IntoIterator<Item = Pattern>>(&mut self, iter: I) {
        self.patterns.extend(iter);
    }
}

impl<'a> IntoIterator for &'a PatternList {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}

/// Decide whether `path` should be skipped.
///
/// The first matching pattern wins: an exclude drops the path, an include keeps
/// it. When nothing matches the path is kept.
pub fn exclude_path(path: &str, patterns: &[Pattern]) -> bool {
    match patterns.iter().find(|pattern| pattern.matches(path)) {
        Some(pattern) => {
            log::trace!("{} decided by {}", path, pattern);
            pattern.kind == PatternKind::Exclude
        }
        None => false,
    }
}

/// Split a path into its directory and final component.
///
/// `"/foo/bar"` gives `("/foo", "bar")`, `"/foo"` gives `("/", "foo")` and
/// `"foo"` gives `("", "foo")`. Trailing slashes are stripped from the directory
/// unless it consists only of slashes.
fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => {
            let head = &path[..=idx];
            let tail = &path[idx + 1..];
            let trimmed = head.trim_end_matches('/');
            if trimmed.is_empty() {
                (head, tail)
            } else {
                (trimmed, tail)
            }
        }
        None => ("", path),
    }
}

/// Rewrite shell glob text into the globset dialect.
///
/// Shell globs know `*`, `?` and `[...]` classes with `!` negation. A `[`
/// without a closing `]` is a plain character, `^` never negates, braces are
/// literal and `**` is just `*`. Returns `None` when the pattern contains a
/// class that can match nothing.
fn translate_glob(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                while chars.get(i) == Some(&'*') {
                    i += 1;
                }
                out.push('*');
            }
            '?' => out.push('?'),
            '[' => {
                // A leading `!` and a leading `]` belong to the class body.
                let mut end = i;
                if chars.get(end) == Some(&'!') {
                    end += 1;
                }
                if chars.get(end) == Some(&']') {
                    end += 1;
                }
                while end < chars.len() && chars[end] != ']' {
                    end += 1;
                }
                if end >= chars.len() {
                    out.push_str("[[]");
                    continue;
                }

                let negated = chars[i] == '!';
                let body = class_body(&chars[if negated { i + 1 } else { i }..end]);
                i = end + 1;

                match (body.as_str(), negated) {
                    ("", false) => return None,
                    ("", true) => out.push('?'),
                    ("^", false) => out.push('^'),
                    (body, negated) => {
                        out.push('[');
                        if negated {
                            out.push('!');
                        }
                        out.push_str(body);
                        out.push(']');
                    }
                }
            }
            ']' | '{' | '}' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
    }

    Some(out)
}

/// Render the members of a shell class so globset reads them the same way.
///
/// Reversed ranges match nothing and are dropped. `]` goes first, `^` and `-`
/// go last so none of them changes meaning.
fn class_body(members: &[char]) -> String {
    let mut singles = Vec::new();
    let mut ranges = Vec::new();
    let mut i = 0;

    while i < members.len() {
        if i + 2 < members.len() && members[i + 1] == '-' {
            let (lo, hi) = (members[i], members[i + 2]);
            i += 3;
            if lo > hi {
                continue;
            }
            if lo == '^' {
                singles.push('^');
                match char::from_u32(u32::from(lo) + 1) {
                    Some(next) if next <= hi => ranges.push((next, hi)),
                    _ => {}
                }
            } else {
                ranges.push((lo, hi));
            }
        } else {
            singles.push(members[i]);
            i += 1;
        }
    }

    let mut body = String::new();
    if singles.contains(&']') {
        body.push(']');
    }
    for (lo, hi) in ranges {
        body.push(lo);
        body.push('-');
        body.push(hi);
    }
    for &c in &singles {
        if !matches!(c, ']' | '^' | '-') && !body.contains(c) {
            body.push(c);
        }
    }
    match (singles.contains(&'^'), singles.contains(&'-')) {
        // `[^-]` would negate; `[-^]` does not.
        (true, true) if body.is_empty() => body.push_str("-^"),
        (caret, dash) => {
            if caret {
                body.push('^');
            }
            if dash {
                body.push('-');
            }
        }
    }
    body
}
