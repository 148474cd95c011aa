//! Month table
//!
//! Each month has a directory key (the folder name below the root directory)
//! and a German label used in output filenames.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local};

use crate::error::{Error, Result};

/// One of the twelve months of the year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    /// All months in calendar order
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Name of the month directory below the root directory
    pub fn dir_name(self) -> &'static str {
        match self {
            Month::January => "january",
            Month::February => "february",
            Month::March => "march",
            Month::April => "april",
            Month::May => "may",
            Month::June => "june",
            Month::July => "july",
            Month::August => "august",
            Month::September => "september",
            Month::October => "october",
            Month::November => "november",
            Month::December => "december",
        }
    }

    /// German label used in output filenames
    pub fn label(self) -> &'static str {
        match self {
            Month::January => "januar",
            Month::February => "februar",
            Month::March => "märz",
            Month::April => "april",
            Month::May => "mai",
            Month::June => "juni",
            Month::July => "juli",
            Month::August => "august",
            Month::September => "september",
            Month::October => "oktober",
            Month::November => "november",
            Month::December => "dezember",
        }
    }

    /// Month for a 1-based calendar number
    pub fn from_number(number: u32) -> Option<Month> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        Month::ALL.get(index).copied()
    }

    /// The current month in local time
    pub fn current() -> Month {
        // chrono guarantees 1..=12
        Month::from_number(Local::now().month()).unwrap_or(Month::January)
    }

    /// Position in [`Month::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Month {
    type Err = Error;

    /// Accepts the directory key (`march`) or the label (`märz`), ignoring case
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        Month::ALL
            .into_iter()
            .find(|m| m.dir_name() == needle || m.label() == needle)
            .ok_or_else(|| Error::InvalidMonth(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dir_name_and_label() {
        assert_eq!("march".parse::<Month>().unwrap(), Month::March);
        assert_eq!("März".parse::<Month>().unwrap(), Month::March);
        assert_eq!(" Dezember ".parse::<Month>().unwrap(), Month::December);
        assert_eq!("MAY".parse::<Month>().unwrap(), Month::May);
    }

    #[test]
    fn test_parse_unknown_month() {
        let result = "smarch".parse::<Month>();
        assert!(matches!(result, Err(Error::InvalidMonth(_))));
    }

    #[test]
    fn test_from_number() {
        assert_eq!(Month::from_number(1), Some(Month::January));
        assert_eq!(Month::from_number(12), Some(Month::December));
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
    }

    #[test]
    fn test_index_matches_calendar_order() {
        for (i, month) in Month::ALL.iter().enumerate() {
            assert_eq!(month.index(), i);
        }
    }
}
