//! Year file naming: `solarview_????.json` style templates.

/// The year placeholder: exactly four `?`.
pub const YEAR_PLACEHOLDER: &str = "????";

/// Rejected file name templates.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    /// No `????` in the template.
    #[error("pattern {0:?} has no `????` year placeholder")]
    NoPlaceholder(String),
    /// `?` used anywhere besides one run of exactly four.
    #[error("pattern {0:?} must contain exactly one run of four `?`")]
    AmbiguousPlaceholder(String),
    /// Template names a path instead of a file.
    #[error("pattern {0:?} must be a bare file name")]
    PathSeparator(String),
}

/// Parsed file name template. The year is always written with four digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    prefix: String,
    suffix: String,
}

impl FilePattern {
    /// Parse and validate a template.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.contains(['/', '\\']) {
            return Err(PatternError::PathSeparator(pattern.to_string()));
        }
        let Some(at) = pattern.find(YEAR_PLACEHOLDER) else {
            return Err(PatternError::NoPlaceholder(pattern.to_string()));
        };
        let prefix = &pattern[..at];
        let suffix = &pattern[at + YEAR_PLACEHOLDER.len()..];
        if prefix.contains('?') || suffix.contains('?') {
            return Err(PatternError::AmbiguousPlaceholder(pattern.to_string()));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// File name for `year`.
    pub fn file_name(&self, year: i32) -> String {
        format!("{}{year:04}{}", self.prefix, self.suffix)
    }

    /// Year encoded in `name`, if it matches the template.
    pub fn year_of(&self, name: &str) -> Option<i32> {
        let digits = name.strip_prefix(&self.prefix)?.strip_suffix(&self.suffix)?;
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl std::fmt::Display for FilePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{YEAR_PLACEHOLDER}{}", self.prefix, self.suffix)
    }
}
