use crate::metadata::PointMetadata;
use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn pr_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // ASCII digits only: `\d` would also accept other Unicode decimal digits.
    RE.get_or_init(|| Regex::new(r"^[0-9]+$").expect("valid regex"))
}

/// Matching predicate over point metadata, resolved once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    MatchAll,
    MatchExact { target_url: String },
}

impl FilterSpec {
    /// Resolves the prompt answer: `None` is a cancelled prompt.
    pub fn from_prompt(answer: Option<&str>, url_base: &str) -> Result<Self> {
        match answer {
            None => Err(Error::UserCancelled),
            Some(raw) => Self::parse(raw, url_base),
        }
    }

    /// Blank input selects everything; a run of ASCII digits selects the pull request with
    /// that number. Anything else (including digits with surrounding whitespace) is rejected.
    pub fn parse(raw: &str, url_base: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::MatchAll);
        }
        let invalid = || Error::InvalidFilterInput {
            input: raw.to_string(),
        };
        if !pr_number_regex().is_match(raw) {
            return Err(invalid());
        }
        let number = raw.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self::for_pull_request(number, url_base))
    }

    pub fn for_pull_request(number: u64, url_base: &str) -> Self {
        Self::MatchExact {
            target_url: format!("{url_base}{number}"),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::MatchExact { .. })
    }

    pub fn target_url(&self) -> Option<&str> {
        match self {
            Self::MatchAll => None,
            Self::MatchExact { target_url } => Some(target_url),
        }
    }

    /// Exact, case-sensitive comparison against the record's `url`; records without a `url`
    /// never match an active filter.
    pub fn matches(&self, metadata: &PointMetadata) -> bool {
        match self {
            Self::MatchAll => true,
            Self::MatchExact { target_url } => metadata.url() == Some(target_url.as_str()),
        }
    }

    /// `All Entries` or `URL: <target>`.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchAll => f.write_str("All Entries"),
            Self::MatchExact { target_url } => write!(f, "URL: {target_url}"),
        }
    }
}
