//! Case records returned by the registry backends.
//!
//! Every backend produces the same base shape ([`CaseDetails`]); the Bombay
//! High Court extends it with remarks and tagged-along matters, and the Delhi
//! High Court's case-status path returns a structurally different record.
//! [`CaseRecord`] is the tagged union consumers switch on.
//!
//! Records are written with a `kind` discriminant. Records without one
//! (scraper output, snapshots saved before the discriminant existed) are
//! classified by their fields: `listing_info` marks a Delhi status record,
//! `with_cases`, `remarks` or `court_time` a Bombay cause-list entry, and
//! anything else is a base case.
//!
//! Dates are kept in each backend's native string format and are never
//! normalised on output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::criteria::CoreError;

/// A record registry reachable through its own backend adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Court {
    Supreme,
    Delhi,
    Bombay,
    Nclat,
    Cerc,
}

impl Court {
    /// All courts in registration order. Fan-in output follows this order.
    pub const ALL: [Court; 5] = [
        Court::Supreme,
        Court::Delhi,
        Court::Bombay,
        Court::Nclat,
        Court::Cerc,
    ];

    /// Whether the court takes part in a `court = "all"` search.
    ///
    /// The tribunal and the commission are only reachable when selected alone.
    pub fn in_all(self) -> bool {
        matches!(self, Court::Supreme | Court::Delhi | Court::Bombay)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Court::Supreme => "supreme",
            Court::Delhi => "delhi",
            Court::Bombay => "bombay",
            Court::Nclat => "nclat",
            Court::Cerc => "cerc",
        }
    }
}

impl fmt::Display for Court {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Court {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supreme" => Ok(Court::Supreme),
            "delhi" => Ok(Court::Delhi),
            "bombay" => Ok(Court::Bombay),
            "nclat" => Ok(Court::Nclat),
            "cerc" => Ok(Court::Cerc),
            _ => Err(CoreError::UnknownCourt(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Court {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Base fields shared by every search result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseDetails {
    /// Jurisdiction-local identifier; not unique across courts.
    pub case_number: String,
    pub petitioner: String,
    pub respondent: String,
    pub advocates: String,
    pub court: Court,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_no: Option<String>,
    /// Backend-native date string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl CaseDetails {
    pub fn new(court: Court, case_number: impl Into<String>) -> Self {
        Self {
            case_number: case_number.into(),
            petitioner: String::new(),
            respondent: String::new(),
            advocates: String::new(),
            court,
            judge: None,
            court_no: None,
            date: None,
        }
    }

    pub fn with_parties(
        mut self,
        petitioner: impl Into<String>,
        respondent: impl Into<String>,
    ) -> Self {
        self.petitioner = petitioner.into();
        self.respondent = respondent.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// A linked matter listed alongside a Bombay High Court case.
///
/// References the other case by number only; it may not be resolvable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WithCase {
    pub case_number: String,
    pub details: String,
}

/// Bombay High Court cause-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BombayCase {
    #[serde(flatten)]
    pub case: CaseDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_time: Option<String>,
    /// Ordered as listed upstream.
    #[serde(default)]
    pub with_cases: Vec<WithCase>,
}

/// Delhi High Court case-status record.
///
/// Not an extension of [`CaseDetails`]: listing and link fields replace the
/// date and judge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelhiStatus {
    pub case_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub petitioner: String,
    pub respondent: String,
    pub advocates: String,
    pub listing_info: String,
    pub court: Court,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judgment_link: Option<String>,
}

/// Any record a backend can return.
///
/// Equality is structural: two records are equal only if every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseRecord {
    Case(CaseDetails),
    Bombay(BombayCase),
    DelhiStatus(DelhiStatus),
}

impl<'de> Deserialize<'de> for CaseRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireRecord::deserialize(deserializer)? {
            WireRecord::Tagged(TaggedRecord::Case(c)) => CaseRecord::Case(c),
            WireRecord::Tagged(TaggedRecord::Bombay(b)) => CaseRecord::Bombay(b),
            WireRecord::Tagged(TaggedRecord::DelhiStatus(d)) => CaseRecord::DelhiStatus(d),
            WireRecord::Bare(bare) => bare.into(),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireRecord {
    Tagged(TaggedRecord),
    Bare(BareRecord),
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TaggedRecord {
    Case(CaseDetails),
    Bombay(BombayCase),
    DelhiStatus(DelhiStatus),
}

/// Union of every record's fields, for input without a `kind`.
/// Nulls are accepted wherever upstream may send them.
#[derive(Deserialize)]
struct BareRecord {
    case_number: String,
    court: Court,
    petitioner: Option<String>,
    respondent: Option<String>,
    advocates: Option<String>,
    judge: Option<String>,
    court_no: Option<String>,
    date: Option<String>,
    remarks: Option<String>,
    court_time: Option<String>,
    with_cases: Option<Vec<WithCase>>,
    status: Option<String>,
    listing_info: Option<String>,
    order_link: Option<String>,
    judgment_link: Option<String>,
}

impl From<BareRecord> for CaseRecord {
    fn from(r: BareRecord) -> Self {
        let petitioner = r.petitioner.unwrap_or_default();
        let respondent = r.respondent.unwrap_or_default();
        let advocates = r.advocates.unwrap_or_default();

        if let Some(listing_info) = r.listing_info {
            return CaseRecord::DelhiStatus(DelhiStatus {
                case_number: r.case_number,
                status: r.status,
                petitioner,
                respondent,
                advocates,
                listing_info,
                court: r.court,
                court_no: r.court_no,
                order_link: r.order_link,
                judgment_link: r.judgment_link,
            });
        }

        let case = CaseDetails {
            case_number: r.case_number,
            petitioner,
            respondent,
            advocates,
            court: r.court,
            judge: r.judge,
            court_no: r.court_no,
            date: r.date,
        };
        if r.with_cases.is_some() || r.remarks.is_some() || r.court_time.is_some() {
            CaseRecord::Bombay(BombayCase {
                case,
                remarks: r.remarks,
                court_time: r.court_time,
                with_cases: r.with_cases.unwrap_or_default(),
            })
        } else {
            CaseRecord::Case(case)
        }
    }
}

impl CaseRecord {
    pub fn case_number(&self) -> &str {
        match self {
            CaseRecord::Case(c) => &c.case_number,
            CaseRecord::Bombay(b) => &b.case.case_number,
            CaseRecord::DelhiStatus(d) => &d.case_number,
        }
    }

    pub fn court(&self) -> Court {
        match self {
            CaseRecord::Case(c) => c.court,
            CaseRecord::Bombay(b) => b.case.court,
            CaseRecord::DelhiStatus(d) => d.court,
        }
    }

    pub fn petitioner(&self) -> &str {
        match self {
            CaseRecord::Case(c) => &c.petitioner,
            CaseRecord::Bombay(b) => &b.case.petitioner,
            CaseRecord::DelhiStatus(d) => &d.petitioner,
        }
    }

    pub fn respondent(&self) -> &str {
        match self {
            CaseRecord::Case(c) => &c.respondent,
            CaseRecord::Bombay(b) => &b.case.respondent,
            CaseRecord::DelhiStatus(d) => &d.respondent,
        }
    }

    /// Identity key used by identity-keyed diffing: `(court, case_number)`.
    pub fn identity(&self) -> (Court, &str) {
        (self.court(), self.case_number())
    }
}

impl From<CaseDetails> for CaseRecord {
    fn from(c: CaseDetails) -> Self {
        CaseRecord::Case(c)
    }
}

impl From<BombayCase> for CaseRecord {
    fn from(b: BombayCase) -> Self {
        CaseRecord::Bombay(b)
    }
}

impl From<DelhiStatus> for CaseRecord {
    fn from(d: DelhiStatus) -> Self {
        CaseRecord::DelhiStatus(d)
    }
}

/// The complete result set last observed for a monitor key.
///
/// Always the latest full scrape, never an accumulated history.
pub type Snapshot = Vec<CaseRecord>;
