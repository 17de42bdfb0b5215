use regex::Regex;

use crate::error::SyncError;

/// Whether a filter match excludes (blacklist) or includes (whitelist) an entry.
/// Chosen per sync invocation; the filter set itself is mode-agnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Blacklist,
    Whitelist,
}

impl FilterMode {
    /// An entry is skipped when `whitelist XOR matched`.
    pub fn skips(self, matched: bool) -> bool {
        (self == FilterMode::Whitelist) != matched
    }

    pub fn from_whitelist(use_whitelist: bool) -> Self {
        if use_whitelist { FilterMode::Whitelist } else { FilterMode::Blacklist }
    }
}

#[derive(Debug, Clone)]
enum Rule {
    // fragment searched anywhere in the candidate path
    Relative(Regex),
    // one regex per path segment; first segment may align at any depth
    Absolute(Vec<Regex>),
}

/// Ordered set of path patterns, compiled once.
///
/// A pattern without a leading `/` is a regex fragment matched anywhere in the
/// candidate path. A pattern with a leading `/` is split into segments; its
/// first segment is searched for among the path segments and the remaining
/// segments must then match the following path segments one by one. A path
/// that runs out of segments before the pattern does counts as matched, so
/// ancestors of a selected directory are selected too.
///
/// `\/` inside a pattern is read as a plain separator, so `/app/.*\/translations`
/// has the three segments `app`, `.*` and `translations`.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    rules: Vec<Rule>,
    raw: Vec<String>,
}

impl FilterSet {
    pub fn new<I, S>(patterns: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = FilterSet::default();
        for p in patterns {
            set.push(p.as_ref())?;
        }
        Ok(set)
    }

    /// Compile and append one pattern.
    pub fn push(&mut self, pattern: &str) -> Result<(), SyncError> {
        let rule = if let Some(abs) = pattern.strip_prefix('/') {
            let unescaped = abs.replace("\\/", "/");
            let segments = unescaped
                .split('/')
                .map(|seg| compile(pattern, seg))
                .collect::<Result<Vec<_>, _>>()?;
            Rule::Absolute(segments)
        } else {
            Rule::Relative(compile(pattern, &format!("(?:{})", pattern))?)
        };
        self.rules.push(rule);
        self.raw.push(pattern.to_string());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn patterns(&self) -> &[String] {
        &self.raw
    }

    /// Does `path` match any pattern? First match wins; an empty set matches nothing.
    pub fn matches(&self, path: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        self.rules.iter().any(|rule| match rule {
            Rule::Relative(re) => re.is_match(path),
            Rule::Absolute(parts) => matches_segments(parts, &segments),
        })
    }
}

fn compile(pattern: &str, body: &str) -> Result<Regex, SyncError> {
    Regex::new(body).map_err(|e| SyncError::FilterPatternInvalid {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn matches_segments(parts: &[Regex], path: &[&str]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return true;
    };
    // skip phase, bounded by the path length
    let Some(start) = path.iter().position(|seg| first.is_match(seg)) else {
        return false;
    };
    let mut idx = start + 1;
    for part in rest {
        match path.get(idx) {
            Some(seg) if part.is_match(seg) => idx += 1,
            Some(_) => return false,
            None => return true,
        }
    }
    true
}
