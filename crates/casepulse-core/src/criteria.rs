//! Search criteria and monitor keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::Court;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown court selector: {0:?}")]
    UnknownCourt(String),

    #[error("monitor keyword must not be empty")]
    EmptyKeyword,
}

/// Which backends a search is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CourtSelector {
    /// Every court where [`Court::in_all`] holds.
    All,
    /// Exactly one court. Dates are passed through as given.
    One(Court),
}

impl CourtSelector {
    /// Courts selected, in registration order.
    pub fn courts(self) -> Vec<Court> {
        match self {
            CourtSelector::All => Court::ALL.into_iter().filter(|c| c.in_all()).collect(),
            CourtSelector::One(court) => vec![court],
        }
    }

    pub fn is_all(self) -> bool {
        matches!(self, CourtSelector::All)
    }
}

impl fmt::Display for CourtSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourtSelector::All => f.write_str("all"),
            CourtSelector::One(court) => court.fmt(f),
        }
    }
}

impl FromStr for CourtSelector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CourtSelector::All);
        }
        s.parse().map(CourtSelector::One)
    }
}

impl Serialize for CourtSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CourtSelector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Single-date and range searches are mutually exclusive request shapes.
///
/// A range needs both `startDate` and `endDate`; a lone end, or a range mixed
/// with `date`, is rejected rather than read as a dateless single search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SearchWindow {
    Range {
        #[serde(rename = "startDate")]
        start: String,
        #[serde(rename = "endDate")]
        end: String,
    },
    Single {
        #[serde(default)]
        date: Option<String>,
    },
}

impl<'de> Deserialize<'de> for SearchWindow {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Fields {
            #[serde(rename = "startDate")]
            start: Option<String>,
            #[serde(rename = "endDate")]
            end: Option<String>,
            date: Option<String>,
        }

        let f = Fields::deserialize(deserializer)?;
        match (f.start, f.end, f.date) {
            (Some(start), Some(end), None) => Ok(SearchWindow::Range { start, end }),
            (None, None, date) => Ok(SearchWindow::Single { date }),
            (Some(_), Some(_), Some(_)) => Err(serde::de::Error::custom(
                "date cannot be combined with startDate/endDate",
            )),
            (Some(_), None, _) => Err(serde::de::Error::missing_field("endDate")),
            (None, Some(_), _) => Err(serde::de::Error::missing_field("startDate")),
        }
    }
}

/// One logical search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(rename = "partyName")]
    pub party_name: String,
    pub court: CourtSelector,
    #[serde(flatten)]
    pub window: SearchWindow,
}

impl SearchCriteria {
    pub fn single(
        party_name: impl Into<String>,
        court: CourtSelector,
        date: Option<String>,
    ) -> Self {
        Self {
            party_name: party_name.into(),
            court,
            window: SearchWindow::Single { date },
        }
    }

    pub fn range(
        party_name: impl Into<String>,
        court: CourtSelector,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            party_name: party_name.into(),
            court,
            window: SearchWindow::Range {
                start: start.into(),
                end: end.into(),
            },
        }
    }
}

pub const DEFAULT_MODE: &str = "party";

/// A watch registered on a keyword.
///
/// `year` only selects within the regional status monitor; it does not
/// take part in the top court's snapshot file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorKey {
    pub court: Court,
    pub keyword: String,
    pub mode: String,
    #[serde(default)]
    pub year: Option<String>,
}

impl MonitorKey {
    /// Build a key, trimming the keyword. `mode` falls back to `"party"`.
    pub fn new(court: Court, keyword: &str, mode: Option<&str>) -> Result<Self, CoreError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(CoreError::EmptyKeyword);
        }
        let mode = mode
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODE);
        Ok(Self {
            court,
            keyword: keyword.to_string(),
            mode: mode.to_string(),
            year: None,
        })
    }

    pub fn with_year(mut self, year: Option<String>) -> Self {
        self.year = year.filter(|y| !y.trim().is_empty());
        self
    }

    /// Filesystem-safe snapshot file name for this key.
    ///
    /// Top court keys keep the historical `keyword_mode.json` layout; every
    /// other court is prefixed with its name and suffixed with the year.
    pub fn file_name(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if self.court != Court::Supreme {
            parts.push(self.court.as_str().to_string());
        }
        parts.push(sanitize(&self.keyword));
        parts.push(sanitize(&self.mode));
        if self.court != Court::Supreme {
            if let Some(year) = &self.year {
                parts.push(sanitize(year));
            }
        }
        format!("{}.json", parts.join("_"))
    }
}

fn sanitize(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selects_high_courts_in_order() {
        assert_eq!(
            CourtSelector::All.courts(),
            vec![Court::Supreme, Court::Delhi, Court::Bombay]
        );
        assert_eq!(CourtSelector::One(Court::Nclat).courts(), vec![Court::Nclat]);
    }

    #[test]
    fn selector_parses() {
        assert_eq!("all".parse::<CourtSelector>().unwrap(), CourtSelector::All);
        assert_eq!(
            "cerc".parse::<CourtSelector>().unwrap(),
            CourtSelector::One(Court::Cerc)
        );
        assert!("everything".parse::<CourtSelector>().is_err());
    }

    #[test]
    fn single_date_request_json() {
        let json = r#"{"partyName": "Tata Power", "court": "all", "date": "2024-03-05"}"#;
        let criteria: SearchCriteria = serde_json::from_str(json).unwrap();
        assert_eq!(criteria.court, CourtSelector::All);
        assert_eq!(
            criteria.window,
            SearchWindow::Single {
                date: Some("2024-03-05".into())
            }
        );
    }

    #[test]
    fn single_date_request_without_date() {
        let json = r#"{"partyName": "Tata Power", "court": "delhi"}"#;
        let criteria: SearchCriteria = serde_json::from_str(json).unwrap();
        assert_eq!(criteria.window, SearchWindow::Single { date: None });
    }

    #[test]
    fn range_request_json() {
        let json = r#"{
            "partyName": "Tata Power",
            "court": "nclat",
            "startDate": "2024-03-01",
            "endDate": "2024-03-31"
        }"#;
        let criteria: SearchCriteria = serde_json::from_str(json).unwrap();
        assert_eq!(criteria.court, CourtSelector::One(Court::Nclat));
        assert_eq!(
            criteria.window,
            SearchWindow::Range {
                start: "2024-03-01".into(),
                end: "2024-03-31".into()
            }
        );
    }

    #[test]
    fn range_request_missing_an_end_rejected() {
        for json in [
            r#"{"partyName": "Acme", "court": "all", "startDate": "2024-03-01"}"#,
            r#"{"partyName": "Acme", "court": "all", "endDate": "2024-03-31"}"#,
            r#"{"partyName": "Acme", "court": "all", "startDate": "2024-03-01", "date": "2024-03-05"}"#,
        ] {
            let err = serde_json::from_str::<SearchCriteria>(json).unwrap_err();
            assert!(err.to_string().contains("Date"), "{json}: {err}");
        }
    }

    #[test]
    fn range_mixed_with_date_rejected() {
        let json = r#"{
            "partyName": "Acme",
            "court": "all",
            "date": "2024-03-05",
            "startDate": "2024-03-01",
            "endDate": "2024-03-31"
        }"#;
        assert!(serde_json::from_str::<SearchCriteria>(json).is_err());
    }

    #[test]
    fn supreme_file_name_matches_legacy_layout() {
        let key = MonitorKey::new(Court::Supreme, "  reliance industries ", None).unwrap();
        assert_eq!(key.mode, "party");
        assert_eq!(key.file_name(), "reliance_industries_party.json");
    }

    #[test]
    fn supreme_file_name_ignores_year() {
        let key = MonitorKey::new(Court::Supreme, "acme", Some("party"))
            .unwrap()
            .with_year(Some("2024".into()));
        assert_eq!(key.file_name(), "acme_party.json");
    }

    #[test]
    fn regional_file_name_includes_court_and_year() {
        let key = MonitorKey::new(Court::Delhi, "acme", Some("advocate"))
            .unwrap()
            .with_year(Some("2024".into()));
        assert_eq!(key.file_name(), "delhi_acme_advocate_2024.json");
    }

    #[test]
    fn file_name_strips_path_separators() {
        let key = MonitorKey::new(Court::Supreme, "../etc/passwd", None).unwrap();
        let name = key.file_name();
        assert!(!name.contains('/'));
        assert_eq!(name, "___etc_passwd_party.json");
    }

    #[test]
    fn empty_keyword_rejected() {
        assert_eq!(
            MonitorKey::new(Court::Supreme, "   ", None),
            Err(CoreError::EmptyKeyword)
        );
    }
}
