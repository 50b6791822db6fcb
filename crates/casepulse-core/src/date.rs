//! Date normalisation into each backend's native literal format.
//!
//! Callers supply ISO calendar dates (`YYYY-MM-DD`). Each registry expects its
//! own literal:
//!
//! | Court   | Format       | Example      |
//! |---------|--------------|--------------|
//! | supreme | `YYYY-MM-DD` | `2024-03-05` |
//! | delhi   | `DD.MM.YYYY` | `05.03.2024` |
//! | bombay  | `DD-MM-YYYY` | `05-03-2024` |
//! | nclat   | `DD/MM/YYYY` | `05/03/2024` |
//! | cerc    | as given     | `2024-03`    |
//!
//! The tribunal path is lenient: callers may already hold a tribunal-native
//! string (e.g. scraped from an earlier result), so normalisation there is
//! idempotent on already-correct input.

use chrono::NaiveDate;
use thiserror::Error;

use crate::record::Court;

const ISO: &str = "%Y-%m-%d";
const DOTTED: &str = "%d.%m.%Y";
const DASHED: &str = "%d-%m-%Y";
const SLASHED: &str = "%d/%m/%Y";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid date format: {input:?} (expected {expected})")]
    InvalidDateFormat { input: String, expected: &'static str },
}

/// Literal date format a backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// Passed through unchanged.
    Verbatim,
    Dotted,
    Dashed,
    /// Lenient: accepts slash, dash-first-day, or ISO input.
    Slashed,
}

impl DateFormat {
    pub fn for_court(court: Court) -> Self {
        match court {
            Court::Supreme | Court::Cerc => DateFormat::Verbatim,
            Court::Delhi => DateFormat::Dotted,
            Court::Bombay => DateFormat::Dashed,
            Court::Nclat => DateFormat::Slashed,
        }
    }

    pub fn apply(self, input: &str) -> Result<String, DateError> {
        match self {
            DateFormat::Verbatim => Ok(input.to_string()),
            DateFormat::Dotted => to_dotted(input),
            DateFormat::Dashed => to_dashed(input),
            DateFormat::Slashed => to_slashed(input),
        }
    }
}

/// Normalise an ISO date into `court`'s native format.
pub fn normalize(court: Court, input: &str) -> Result<String, DateError> {
    DateFormat::for_court(court).apply(input)
}

fn parse(input: &str, fmt: &str, expected: &'static str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(input.trim(), fmt).map_err(|_| DateError::InvalidDateFormat {
        input: input.to_string(),
        expected,
    })
}

/// `YYYY-MM-DD` → `DD.MM.YYYY`.
pub fn to_dotted(input: &str) -> Result<String, DateError> {
    Ok(parse(input, ISO, "YYYY-MM-DD")?.format(DOTTED).to_string())
}

/// `YYYY-MM-DD` → `DD-MM-YYYY`.
pub fn to_dashed(input: &str) -> Result<String, DateError> {
    Ok(parse(input, ISO, "YYYY-MM-DD")?.format(DASHED).to_string())
}

/// Tribunal normalisation to `DD/MM/YYYY`.
///
/// 1. Input containing `/` is assumed already correct and passed through.
/// 2. `DD-MM-YYYY` (dash at index 2) is reshaped.
/// 3. Anything else must be ISO.
pub fn to_slashed(input: &str) -> Result<String, DateError> {
    if input.contains('/') {
        return Ok(input.to_string());
    }
    let date = if input.as_bytes().get(2) == Some(&b'-') {
        parse(input, DASHED, "DD-MM-YYYY")?
    } else {
        parse(input, ISO, "YYYY-MM-DD, DD-MM-YYYY or DD/MM/YYYY")?
    };
    Ok(date.format(SLASHED).to_string())
}
