/// Default separator between tag names in text form.
pub const DEFAULT_DELIMITER: &str = ",";

/// Configuration threaded through parsing and formatting.
///
/// The delimiter is an explicit value rather than process-wide state, so two
/// services with different delimiters can coexist in one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConfig {
    /// Separator used to split and join tag names.
    pub delimiter: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

impl TagConfig {
    /// Creates a configuration with the given delimiter.
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    /// Parses configuration from environment variables.
    ///
    /// Falls back to defaults when env vars are not set or empty.
    ///
    /// # Environment Variables
    ///
    /// - `TAGGABLE_DELIMITER` (string, default `,`): Tag name separator
    ///
    /// # Examples
    ///
    /// ```
    /// use taggable::TagConfig;
    ///
    /// let config = TagConfig::from_env();
    /// assert!(!config.delimiter.is_empty());
    /// ```
    pub fn from_env() -> Self {
        let delimiter = std::env::var("TAGGABLE_DELIMITER")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DELIMITER.to_string());

        Self { delimiter }
    }
}
