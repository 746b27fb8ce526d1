use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of a post as reported by the extraction model.
///
/// The model is asked for `English` or `Hinglish` (Hindi written alongside English).
/// `Unknown` marks a degraded record or a label outside that set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    English,
    Hinglish,
    Unknown,
}

impl Language {
    /// Maps a model-supplied label to a language, case-insensitively.
    ///
    /// Anything that is not `English` or `Hinglish` maps to `Unknown`.
    ///
    /// ```
    /// use posttag::Language;
    ///
    /// assert_eq!(Language::from_label(" hinglish "), Language::Hinglish);
    /// assert_eq!(Language::from_label("Marathi"), Language::Unknown);
    /// ```
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hinglish => "Hinglish",
            Self::Unknown => "Unknown",
        }
    }
}

/// Strict parse: only the three labels are accepted (case-insensitive, trimmed).
impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" => Ok(Self::English),
            "hinglish" => Ok(Self::Hinglish),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!(
                "unknown language '{other}' (expected English, Hinglish or Unknown)"
            )),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_exact_labels() {
        assert_eq!(serde_json::to_string(&Language::English).unwrap(), r#""English""#);
        assert_eq!(serde_json::to_string(&Language::Hinglish).unwrap(), r#""Hinglish""#);
        assert_eq!(serde_json::to_string(&Language::Unknown).unwrap(), r#""Unknown""#);
    }

    #[test]
    fn from_label_ignores_case_and_whitespace() {
        assert_eq!(Language::from_label("ENGLISH"), Language::English);
        assert_eq!(Language::from_label("english\n"), Language::English);
        assert_eq!(Language::from_label("HingLish"), Language::Hinglish);
    }

    #[test]
    fn from_label_falls_back_to_unknown() {
        assert_eq!(Language::from_label(""), Language::Unknown);
        assert_eq!(Language::from_label("Hindi"), Language::Unknown);
        assert_eq!(Language::from_label("Unknown"), Language::Unknown);
    }

    #[test]
    fn parse_accepts_labels_case_insensitively() {
        assert_eq!("english".parse::<Language>(), Ok(Language::English));
        assert_eq!(" HINGLISH ".parse::<Language>(), Ok(Language::Hinglish));
        assert_eq!("Unknown".parse::<Language>(), Ok(Language::Unknown));
    }

    #[test]
    fn parse_rejects_other_labels() {
        let err = "Marathi".parse::<Language>().unwrap_err();
        assert!(err.contains("marathi"));
        assert!("".parse::<Language>().is_err());
    }

    #[test]
    fn parse_round_trips_display() {
        for language in [Language::English, Language::Hinglish, Language::Unknown] {
            assert_eq!(language.to_string().parse::<Language>(), Ok(language));
        }
    }

    #[test]
    fn display_matches_serialized_label() {
        assert_eq!(format!("{}", Language::Hinglish), "Hinglish");
    }
}
