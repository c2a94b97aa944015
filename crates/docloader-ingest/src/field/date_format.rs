//! Date patterns in the `MM/dd/yyyy hh:mm:ssa` letter style
//!
//! Load configurations describe dates with the pattern letters used by most
//! JVM tooling. Each pattern is translated once into a chrono format string
//! and reused for every row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use docloader_common::{DocloaderError, Result};

/// Pattern applied to date fields that do not name their own
pub const DEFAULT_DATE_PATTERN: &str = "MM/dd/yyyy hh:mm:ssa";

const DEFAULT_CHRONO_FORMAT: &str = "%m/%d/%Y %I:%M:%S%p";

/// A date pattern and its chrono translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    chrono_format: String,
    has_offset: bool,
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_DATE_PATTERN.to_string(),
            chrono_format: DEFAULT_CHRONO_FORMAT.to_string(),
            has_offset: false,
        }
    }
}

impl DateFormat {
    pub fn new(pattern: &str) -> Result<Self> {
        let chrono_format = translate(pattern)
            .map_err(|message| DocloaderError::field_definition(pattern, message))?;
        let has_offset = chrono_format.contains("%z") || chrono_format.contains("%:z");

        Ok(Self {
            pattern: pattern.to_string(),
            chrono_format,
            has_offset,
        })
    }

    /// The pattern as written in the configuration
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn chrono_format(&self) -> &str {
        &self.chrono_format
    }

    pub fn is_default(&self) -> bool {
        self.pattern == DEFAULT_DATE_PATTERN
    }

    /// Parse `raw` as a UTC timestamp.
    ///
    /// Values without an offset are taken as UTC. Patterns with no time
    /// component resolve to midnight.
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();

        if self.has_offset {
            return DateTime::parse_from_str(raw, &self.chrono_format)
                .ok()
                .map(|dt| dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, &self.chrono_format) {
            return Some(naive.and_utc());
        }

        NaiveDate::parse_from_str(raw, &self.chrono_format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

fn translate(pattern: &str) -> std::result::Result<String, String> {
    if pattern.trim().is_empty() {
        return Err("date pattern is empty".to_string());
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is an escaped quote, otherwise copy up to the closing quote
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let mut j = i + 1;
            loop {
                match chars.get(j) {
                    None => return Err("unterminated quoted text".to_string()),
                    Some('\'') if chars.get(j + 1) == Some(&'\'') => {
                        out.push('\'');
                        j += 2;
                    },
                    Some('\'') => break,
                    Some('%') => {
                        out.push_str("%%");
                        j += 1;
                    },
                    Some(other) => {
                        out.push(*other);
                        j += 1;
                    },
                }
            }
            i = j + 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
            i += 1;
            continue;
        }

        let mut run = 1;
        while chars.get(i + run) == Some(&c) {
            run += 1;
        }

        let item = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1..=2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', _) => "%d",
            ('H', _) => "%H",
            ('h', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('S', 1..=3) => "%3f",
            ('S', 4..=6) => "%6f",
            ('S', _) => "%9f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('z' | 'Z', _) => "%z",
            ('X', _) => "%:z",
            _ => return Err(format!("unsupported pattern letter '{}'", c)),
        };
        out.push_str(item);
        i += run;
    }

    Ok(out)
}
