#![forbid(unsafe_code)]

//! Retention limit and history configuration.

use std::fmt;
use std::num::NonZeroUsize;

use crate::error::{HistoryError, Result};

/// Environment variable read by [`HistoryConfig::from_env`].
pub const LIMIT_ENV_VAR: &str = "REWIND_HISTORY_LIMIT";

/// Maximum number of entries kept per timeline.
///
/// The limit applies to the done and undone timelines independently, so
/// a manager may hold up to twice this many operations in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetentionLimit {
    #[default]
    Unbounded,
    Bounded(NonZeroUsize),
}

impl RetentionLimit {
    /// A bounded limit. Zero is rejected with [`HistoryError::InvalidArgument`].
    pub fn bounded(max: usize) -> Result<Self> {
        NonZeroUsize::new(max).map(Self::Bounded).ok_or_else(|| {
            HistoryError::invalid("retention limit must be a positive count or unbounded")
        })
    }

    /// `None` maps to [`RetentionLimit::Unbounded`].
    pub fn from_option(max: Option<usize>) -> Result<Self> {
        match max {
            None => Ok(Self::Unbounded),
            Some(max) => Self::bounded(max),
        }
    }

    /// The numeric bound, if any.
    #[must_use]
    pub fn get(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(max) => Some(max.get()),
        }
    }

    /// Whether a timeline of `len` entries is over this limit.
    #[must_use]
    pub fn is_exceeded_by(self, len: usize) -> bool {
        matches!(self, Self::Bounded(max) if len > max.get())
    }
}

impl fmt::Display for RetentionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Bounded(max) => write!(f, "{max}"),
        }
    }
}

/// Construction-time configuration for a [`HistoryManager`](crate::HistoryManager).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Retention limit applied to each timeline.
    pub limit: RetentionLimit,
}

impl HistoryConfig {
    #[must_use]
    pub fn new(limit: RetentionLimit) -> Self {
        Self { limit }
    }

    /// No retention limit.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limit(mut self, limit: RetentionLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Load config from environment variables.
    ///
    /// Reads `REWIND_HISTORY_LIMIT`: a positive integer bounds each
    /// timeline. Missing, zero or unparsable values leave history unbounded.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    #[must_use]
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup(LIMIT_ENV_VAR)
            && let Ok(max) = val.trim().parse::<usize>()
        {
            match RetentionLimit::bounded(max) {
                Ok(limit) => config.limit = limit,
                Err(_) => {
                    tracing::warn!(
                        var = LIMIT_ENV_VAR,
                        value = %val,
                        "ignoring zero retention limit, history stays unbounded"
                    );
                }
            }
        }

        config
    }
}
