//! Blacklist rules: `/regex/` lines or literal paths

use crate::types::FsakError;
use regex::Regex;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
enum Rule {
    /// Tested against the full path string
    Pattern(Regex),
    /// Anchored exact match on the full path string
    Literal(String),
}

/// Compiled exclusion rules
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    rules: Vec<Rule>,
}

impl ExclusionRules {
    /// No exclusions
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse line-delimited rules
    ///
    /// A line wrapped in `/.../` is a regular expression; any other
    /// non-blank line is a literal path. Lines are trimmed and blank lines
    /// ignored.
    ///
    /// # Errors
    /// * `FsakError::Config` for a malformed regular expression
    pub fn parse(text: &str) -> Result<Self, FsakError> {
        let mut rules = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if line.len() >= 2 && line.starts_with('/') && line.ends_with('/') {
                let pattern = &line[1..line.len() - 1];
                let regex = Regex::new(pattern).map_err(|e| {
                    FsakError::Config(format!(
                        "Invalid blacklist pattern on line {} '{}': {}",
                        line_no + 1,
                        line,
                        e
                    ))
                })?;
                rules.push(Rule::Pattern(regex));
            } else {
                rules.push(Rule::Literal(line.to_string()));
            }
        }

        Ok(Self { rules })
    }

    /// Load rules from a blacklist file
    pub fn load(path: &Path) -> Result<Self, FsakError> {
        let text = fs::read_to_string(path).map_err(|e| {
            FsakError::Config(format!(
                "Failed to read blacklist file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&text)
    }

    /// Load rules from an optional blacklist path
    pub fn load_optional(path: Option<&Path>) -> Result<Self, FsakError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::none()),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `path` matches any rule
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let text = path.to_string_lossy();
        self.rules.iter().any(|rule| match rule {
            Rule::Pattern(regex) => regex.is_match(&text),
            Rule::Literal(literal) => text == literal.as_str(),
        })
    }
}
