//! Tag-list text grammar.
//!
//! A tag list is written as names separated by a delimiter. A run enclosed in
//! double or single quotes is one name even when it contains the delimiter.

use std::collections::HashSet;

use regex::{Captures, Regex};

/// Parser and formatter for delimited tag-list text.
pub struct TagParser;

impl TagParser {
    /// Splits delimited text into an ordered, deduplicated list of names.
    ///
    /// # Grammar
    ///
    /// - Double-quoted runs are extracted first, then single-quoted runs, each
    ///   in the order encountered. Quote characters are stripped and the
    ///   delimiter inside a quoted run is kept.
    /// - The remaining text is split on the delimiter.
    /// - Every quoted name precedes every unquoted name in the result,
    ///   regardless of position in the input.
    /// - Names are trimmed; blanks and exact duplicates are dropped.
    /// - An unterminated quote is ordinary text.
    ///
    /// # Examples
    ///
    /// ```
    /// use taggable::TagParser;
    ///
    /// assert_eq!(TagParser::parse("A B, C", ","), vec!["A B", "C"]);
    /// assert_eq!(TagParser::parse("\"with, comma\"", ","), vec!["with, comma"]);
    /// assert_eq!(TagParser::parse("Beta, \"Alpha\"", ","), vec!["Alpha", "Beta"]);
    /// assert!(TagParser::parse(None::<&str>, ",").is_empty());
    /// ```
    #[must_use]
    pub fn parse<'a>(text: impl Into<Option<&'a str>>, delimiter: &str) -> Vec<String> {
        let Some(text) = text.into() else {
            return Vec::new();
        };
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut names = Vec::new();
        let mut remaining = text.to_string();

        for quote in ['"', '\''] {
            // The pattern is built from an escaped delimiter; if it still fails
            // to compile, quoted runs fall through to plain splitting.
            if let Ok(pattern) = quoted_run(quote, delimiter) {
                remaining = pattern
                    .replace_all(&remaining, |caps: &Captures<'_>| {
                        names.push(caps[1].to_string());
                        ""
                    })
                    .into_owned();
            }
        }

        if delimiter.is_empty() {
            names.push(remaining);
        } else {
            names.extend(remaining.split(delimiter).map(str::to_string));
        }

        normalize_names(names)
    }

    /// Joins names into canonical delimited text.
    ///
    /// Names containing the delimiter are wrapped in double quotes. The
    /// delimiter is followed by a single space unless it already ends in
    /// whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use taggable::TagParser;
    ///
    /// assert_eq!(
    ///     TagParser::format(["Question", "Crazy Animal"], ","),
    ///     "Question, Crazy Animal"
    /// );
    /// assert_eq!(
    ///     TagParser::format(["Crazy Animal", "Question"], " "),
    ///     "\"Crazy Animal\" Question"
    /// );
    /// ```
    #[must_use]
    pub fn format<I, S>(names: I, delimiter: &str) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let separator = if delimiter.ends_with(char::is_whitespace) {
            delimiter.to_string()
        } else {
            format!("{delimiter} ")
        };

        names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                if !delimiter.is_empty() && name.contains(delimiter) {
                    format!("\"{name}\"")
                } else {
                    name.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(&separator)
    }
}

/// Matches one quoted run plus any trailing whitespace and delimiter.
fn quoted_run(quote: char, delimiter: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"{quote}(.*?){quote}\s*(?:{})?\s*",
        regex::escape(delimiter)
    ))
}

/// Trims names, drops blanks and keeps the first occurrence of each name.
pub(crate) fn normalize_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}
