// Playlist entry filters: duration bounds, upload-date window, title match

use regex::RegexBuilder;
use thiserror::Error;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

use super::models::VideoEntry;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid duration '{0}': use seconds, mm:ss or hh:mm:ss")]
    Duration(String),

    #[error("invalid date '{0}': use YYYY-MM-DD, YYYYMMDD or DD/MM/YYYY")]
    Date(String),

    #[error("invalid title pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Parse a duration filter value into seconds. Accepts a raw number of
/// seconds, `mm:ss` or `hh:mm:ss`.
pub fn parse_duration(input: &str) -> Result<u64, FilterError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(FilterError::Duration(input.to_string()));
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().map_err(|_| FilterError::Duration(input.to_string()));
    }

    let parts: Vec<u64> = s
        .split(':')
        .map(|p| p.parse())
        .collect::<Result<_, _>>()
        .map_err(|_| FilterError::Duration(input.to_string()))?;
    match parts.as_slice() {
        [m, sec] => Ok(m * 60 + sec),
        [h, m, sec] => Ok(h * 3600 + m * 60 + sec),
        _ => Err(FilterError::Duration(input.to_string())),
    }
}

const DATE_LAYOUTS: [&[FormatItem<'static>]; 3] = [
    format_description!("[year]-[month]-[day]"),
    format_description!("[year][month][day]"),
    format_description!("[day]/[month]/[year]"),
];

/// Parse a date filter value and normalise it to `YYYYMMDD`, the layout
/// yt-dlp uses for `upload_date`, so the window check is a string compare.
pub fn parse_date(input: &str) -> Result<String, FilterError> {
    let s = input.trim();
    for layout in DATE_LAYOUTS {
        if let Ok(date) = Date::parse(s, layout) {
            return Ok(format!(
                "{:04}{:02}{:02}",
                date.year(),
                u8::from(date.month()),
                date.day()
            ));
        }
    }
    Err(FilterError::Date(input.to_string()))
}

/// Title filter: plain case-insensitive substring, or a regex.
#[derive(Debug, Clone)]
pub enum TitleMatch {
    Substring(String),
    Pattern(regex::Regex),
}

impl TitleMatch {
    pub fn new(pattern: &str, is_regex: bool) -> Result<Self, FilterError> {
        if is_regex {
            let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;
            Ok(Self::Pattern(re))
        } else {
            Ok(Self::Substring(pattern.to_lowercase()))
        }
    }

    fn matches(&self, title: &str) -> bool {
        match self {
            Self::Substring(needle) => title.to_lowercase().contains(needle),
            Self::Pattern(re) => re.is_match(title),
        }
    }
}

/// Which playlist entries to download. A filter whose field is `None`
/// lets everything through; entries missing the metadata a bound needs
/// are let through as well.
#[derive(Debug, Clone, Default)]
pub struct PlaylistFilters {
    pub min_duration: Option<u64>,
    pub max_duration: Option<u64>,
    /// Inclusive window bounds, normalised to `YYYYMMDD`
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub title: Option<TitleMatch>,
}

impl PlaylistFilters {
    /// Why this entry should be skipped, or `None` to download it.
    pub fn skip_reason(&self, entry: &VideoEntry) -> Option<String> {
        if let (Some(min), Some(duration)) = (self.min_duration, entry.duration) {
            if duration < min as f64 {
                return Some(format!("shorter than the {min}s minimum"));
            }
        }
        if let (Some(max), Some(duration)) = (self.max_duration, entry.duration) {
            if duration > max as f64 {
                return Some(format!("longer than the {max}s maximum"));
            }
        }

        if let (Some(from), Some(uploaded)) = (&self.date_from, &entry.upload_date) {
            if uploaded < from {
                return Some(format!("uploaded before {from}"));
            }
        }
        if let (Some(to), Some(uploaded)) = (&self.date_to, &entry.upload_date) {
            if uploaded > to {
                return Some(format!("uploaded after {to}"));
            }
        }

        if let Some(matcher) = &self.title {
            if !matcher.matches(&entry.title) {
                return Some("title does not match the filter".to_string());
            }
        }

        None
    }
}
