//! Dockerignore pattern matching
//!
//! Patterns follow the `.dockerignore` format: one glob per line, `#`
//! comments, `!` negations, `**` spanning directories. Paths are always
//! relative to the context root and use `/` separators.
//!
//! Later patterns win. A pattern that matches a directory also matches
//! everything below it, so `node_modules` excludes `node_modules/x/y.js`.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// A single compiled ignore pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    text: String,
    exclusion: bool,
    regex: Regex,
}

impl Pattern {
    /// Compile a single pattern line
    ///
    /// Returns `Ok(None)` for blank input. A leading `!` marks a negation
    /// that re-includes paths excluded by earlier patterns.
    pub fn new(raw: &str) -> Result<Option<Self>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let (exclusion, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };
        if exclusion && body.is_empty() {
            return Err(Error::InvalidPattern {
                pattern: raw.to_string(),
                reason: "illegal exclusion pattern".to_string(),
            });
        }

        let text = clean_path(body);
        let regex = compile(&text).map_err(|reason| Error::InvalidPattern {
            pattern: raw.to_string(),
            reason,
        })?;

        Ok(Some(Self {
            text,
            exclusion,
            regex,
        }))
    }

    /// The cleaned pattern text, without the `!` prefix
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether this is a `!` negation
    pub fn is_exclusion(&self) -> bool {
        self.exclusion
    }

    fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Ordered set of ignore patterns
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    patterns: Vec<Pattern>,
    has_exclusions: bool,
}

impl PatternMatcher {
    /// Compile a list of pattern lines
    ///
    /// Any malformed pattern fails the whole set.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for raw in patterns {
            if let Some(pattern) = Pattern::new(raw.as_ref())? {
                compiled.push(pattern);
            }
        }
        let has_exclusions = compiled.iter().any(Pattern::is_exclusion);
        Ok(Self {
            patterns: compiled,
            has_exclusions,
        })
    }

    /// Parse the contents of a `.dockerignore` file
    pub fn parse(contents: &str) -> Result<Self> {
        Self::new(read_patterns(contents))
    }

    /// Load patterns from a file; a missing file yields an empty matcher
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(Error::ReadIgnoreFile {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a context-relative path is excluded
    ///
    /// A pattern matches when it matches the path itself or any of its
    /// parent directories. Only a negation can flip an excluded path back,
    /// and only a plain pattern can exclude an included one.
    pub fn is_excluded(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./");
        let parents = parent_dirs(path);

        let mut excluded = false;
        for pattern in &self.patterns {
            if pattern.exclusion != excluded {
                continue;
            }
            let matched = pattern.matches(path) || parents.iter().any(|p| pattern.matches(p));
            if matched {
                excluded = !pattern.exclusion;
            }
        }
        excluded
    }

    /// Whether traversal can skip an excluded directory entirely
    ///
    /// An excluded directory must still be entered when a negation pattern
    /// names something beneath it.
    pub fn can_skip_dir(&self, dir: &str) -> bool {
        if !self.has_exclusions {
            return true;
        }
        let dir_slash = format!("{}/", dir.trim_end_matches('/'));
        !self
            .patterns
            .iter()
            .filter(|p| p.exclusion)
            .any(|p| format!("{}/", p.text).starts_with(&dir_slash))
    }
}

/// Split ignore-file contents into normalised pattern lines
///
/// Comments are dropped before trimming, so only a `#` in the first column
/// starts a comment. Leading `/` is removed since every pattern is
/// anchored at the context root anyway.
pub fn read_patterns(contents: &str) -> Vec<String> {
    let contents = contents.strip_prefix(UTF8_BOM).unwrap_or(contents);
    let mut patterns = Vec::new();

    for line in contents.lines() {
        if line.starts_with('#') {
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (invert, body) = match line.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, line),
        };

        let mut pattern = String::new();
        if !body.is_empty() {
            pattern = clean_path(body);
            if pattern.len() > 1 && pattern.starts_with('/') {
                pattern.remove(0);
            }
        }
        if invert {
            pattern.insert(0, '!');
        }
        patterns.push(pattern);
    }

    patterns
}

/// Lexically clean a slash-separated path
///
/// Collapses repeated separators, drops `.` elements and resolves `..`
/// against preceding elements. An empty result becomes `.`.
fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// All proper ancestors of a relative path, shallowest first
fn parent_dirs(path: &str) -> Vec<&str> {
    path.match_indices('/').map(|(i, _)| &path[..i]).collect()
}

/// Translate a glob into an anchored regex
///
/// `*` and `?` never cross a `/`; `**` matches any number of directories,
/// including none.
fn compile(pattern: &str) -> std::result::Result<Regex, String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut re = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                if chars.get(i + 1) == Some(&'/') {
                    i += 1;
                }
                if i + 1 == chars.len() {
                    re.push_str(".*");
                } else {
                    re.push_str("(.*/)?");
                }
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            '\\' => {
                i += 1;
                match chars.get(i) {
                    Some(next) => re.push_str(&regex::escape(&next.to_string())),
                    None => return Err("trailing backslash".to_string()),
                }
            }
            '[' => {
                i = compile_class(&chars, i, &mut re)?;
            }
            _ => re.push_str(&regex::escape(&ch.to_string())),
        }
        i += 1;
    }

    re.push('$');
    Regex::new(&re).map_err(|e| e.to_string())
}

/// Copy a `[...]` character class starting at `start`, returning the index
/// of its closing `]`
fn compile_class(
    chars: &[char],
    start: usize,
    re: &mut String,
) -> std::result::Result<usize, String> {
    let mut i = start + 1;
    re.push('[');

    if matches!(chars.get(i), Some('!' | '^')) {
        re.push('^');
        i += 1;
    }

    let mut empty = true;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            ']' if !empty => {
                re.push(']');
                return Ok(i);
            }
            '\\' => {
                i += 1;
                let next = chars
                    .get(i)
                    .ok_or_else(|| "trailing backslash".to_string())?;
                re.push_str(&regex::escape(&next.to_string()));
            }
            '-' => re.push('-'),
            '/' => return Err("character class cannot contain '/'".to_string()),
            _ => re.push_str(&regex::escape(&ch.to_string())),
        }
        empty = false;
        i += 1;
    }

    Err("unterminated character class".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(patterns: &[&str]) -> PatternMatcher {
        PatternMatcher::new(patterns).unwrap()
    }

    #[test]
    fn test_read_patterns_skips_comments_and_blanks() {
        let patterns = read_patterns("\u{feff}# comment\n\n  *.log  \n/target\n! keep.log\n");
        assert_eq!(patterns, vec!["*.log", "target", "!keep.log"]);
    }

    #[test]
    fn test_read_patterns_cleans_paths() {
        let patterns = read_patterns("./a//b/../c\n");
        assert_eq!(patterns, vec!["a/c"]);
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("a/./b/"), "a/b");
        assert_eq!(clean_path("../a"), "../a");
        assert_eq!(clean_path("/../a"), "/a");
        assert_eq!(clean_path(""), ".");
    }

    #[test]
    fn test_literal_match() {
        let m = matcher(&["a.txt"]);
        assert!(m.is_excluded("a.txt"));
        assert!(!m.is_excluded("b.txt"));
        // anchored at the root, unlike gitignore
        assert!(!m.is_excluded("sub/a.txt"));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let m = matcher(&["*.log"]);
        assert!(m.is_excluded("debug.log"));
        assert!(!m.is_excluded("logs/debug.log"));
    }

    #[test]
    fn test_double_star() {
        let m = matcher(&["**/*.log"]);
        assert!(m.is_excluded("debug.log"));
        assert!(m.is_excluded("a/b/debug.log"));
        assert!(!m.is_excluded("a/b/debug.txt"));

        let m = matcher(&["build/**"]);
        assert!(m.is_excluded("build/out/bin"));
    }

    #[test]
    fn test_question_mark_and_class() {
        let m = matcher(&["file?.txt", "data[0-9].csv", "tmp[!a]"]);
        assert!(m.is_excluded("file1.txt"));
        assert!(!m.is_excluded("file10.txt"));
        assert!(m.is_excluded("data7.csv"));
        assert!(!m.is_excluded("datax.csv"));
        assert!(m.is_excluded("tmpb"));
        assert!(!m.is_excluded("tmpa"));
    }

    #[test]
    fn test_directory_pattern_matches_contents() {
        let m = matcher(&["node_modules"]);
        assert!(m.is_excluded("node_modules"));
        assert!(m.is_excluded("node_modules/pkg/index.js"));
    }

    #[test]
    fn test_negation_reincludes() {
        let m = matcher(&["*.md", "!README.md"]);
        assert!(m.is_excluded("CHANGELOG.md"));
        assert!(!m.is_excluded("README.md"));
    }

    #[test]
    fn test_later_pattern_wins() {
        let m = matcher(&["!README.md", "*.md"]);
        assert!(m.is_excluded("README.md"));

        let m = matcher(&["docs", "!docs/keep.md", "docs/keep.md"]);
        assert!(m.is_excluded("docs/keep.md"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let m = matcher(&["a+b(1).txt"]);
        assert!(m.is_excluded("a+b(1).txt"));
        assert!(!m.is_excluded("aab1.txt"));
    }

    #[test]
    fn test_escaped_wildcard() {
        let m = matcher(&[r"star\*"]);
        assert!(m.is_excluded("star*"));
        assert!(!m.is_excluded("starry"));
    }

    #[test]
    fn test_can_skip_dir() {
        let m = matcher(&["vendor"]);
        assert!(m.can_skip_dir("vendor"));

        let m = matcher(&["vendor", "!vendor/keep"]);
        assert!(!m.can_skip_dir("vendor"));
        assert!(m.can_skip_dir("other"));
    }

    #[test]
    fn test_malformed_patterns_are_errors() {
        assert!(matches!(
            PatternMatcher::new(["[abc"]),
            Err(Error::InvalidPattern { .. })
        ));
        assert!(PatternMatcher::new(["abc\\"]).is_err());
        assert!(PatternMatcher::new(["!"]).is_err());
        assert!(PatternMatcher::new(["[z-a]"]).is_err());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let m = PatternMatcher::load(&tmp.path().join(".dockerignore")).unwrap();
        assert!(m.is_empty());
        assert!(!m.is_excluded("anything"));
    }

    #[test]
    fn test_load_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(".dockerignore");
        std::fs::write(&path, "secret\n").unwrap();

        let m = PatternMatcher::load(&path).unwrap();
        assert_eq!(m.patterns().len(), 1);
        assert!(m.is_excluded("secret/key.pem"));
    }
}
