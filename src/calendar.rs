// src/calendar.rs
use chrono::{Datelike, Local, NaiveDate};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;

/// Abbreviated weekday identifier, as stored in `selectedDays`.
///
/// Variant order is the display order (week starts on Monday), so the derived
/// `Ord` is the canonical ordering used everywhere days are sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum DayToken {
    Lun,
    Mar,
    Mer,
    Gio,
    Ven,
    Sab,
    Dom,
}

pub const CANONICAL_ORDER: [DayToken; 7] = [
    DayToken::Lun,
    DayToken::Mar,
    DayToken::Mer,
    DayToken::Gio,
    DayToken::Ven,
    DayToken::Sab,
    DayToken::Dom,
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown day token: '{0}'. Expected one of Lun, Mar, Mer, Gio, Ven, Sab, Dom.")]
pub struct UnknownDay(pub String);

impl DayToken {
    /// Full day name shown in headers and summaries.
    #[must_use]
    pub const fn display_label(self) -> &'static str {
        match self {
            Self::Lun => "Lunedì",
            Self::Mar => "Martedì",
            Self::Mer => "Mercoledì",
            Self::Gio => "Giovedì",
            Self::Ven => "Venerdì",
            Self::Sab => "Sabato",
            Self::Dom => "Domenica",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lun => "Lun",
            Self::Mar => "Mar",
            Self::Mer => "Mer",
            Self::Gio => "Gio",
            Self::Ven => "Ven",
            Self::Sab => "Sab",
            Self::Dom => "Dom",
        }
    }

    /// Sunday-first ordinal mapping (Sunday = 0 .. Saturday = 6).
    #[must_use]
    pub const fn from_sunday_index(index: u32) -> Self {
        match index % 7 {
            0 => Self::Dom,
            1 => Self::Lun,
            2 => Self::Mar,
            3 => Self::Mer,
            4 => Self::Gio,
            5 => Self::Ven,
            _ => Self::Sab,
        }
    }

    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self::from_sunday_index(date.weekday().num_days_from_sunday())
    }
}

impl fmt::Display for DayToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayToken {
    type Err = UnknownDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownDay(trimmed.to_string()))
    }
}

/// Total order over days consistent with [`CANONICAL_ORDER`].
#[must_use]
pub fn compare(a: DayToken, b: DayToken) -> Ordering {
    a.cmp(&b)
}

/// Days offered to the user when picking a schedule. Sunday is opt-in.
#[must_use]
pub fn selectable_days(include_sunday: bool) -> Vec<DayToken> {
    CANONICAL_ORDER
        .iter()
        .copied()
        .filter(|day| include_sunday || *day != DayToken::Dom)
        .collect()
}

/// Source of "today". Injected so the current day can be pinned in tests.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub fn current_day_token(clock: &dyn Clock) -> DayToken {
    DayToken::for_date(clock.today())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sunday_first_mapping() {
        // 2024-06-02 was a Sunday
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(DayToken::for_date(sunday), DayToken::Dom);
        assert_eq!(DayToken::for_date(sunday.succ_opt().unwrap()), DayToken::Lun);
        let saturday = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
        assert_eq!(current_day_token(&FixedClock(saturday)), DayToken::Sab);
    }

    #[test]
    fn canonical_order_starts_on_monday() {
        let mut days = vec![DayToken::Dom, DayToken::Sab, DayToken::Lun, DayToken::Gio];
        days.sort_by(|a, b| compare(*a, *b));
        assert_eq!(
            days,
            vec![DayToken::Lun, DayToken::Gio, DayToken::Sab, DayToken::Dom]
        );
        assert_eq!(DayToken::iter().collect::<Vec<_>>(), CANONICAL_ORDER.to_vec());
    }

    #[test]
    fn parse_tokens() {
        assert_eq!("lun".parse::<DayToken>(), Ok(DayToken::Lun));
        assert_eq!(" GIO ".parse::<DayToken>(), Ok(DayToken::Gio));
        assert_eq!(
            "Monday".parse::<DayToken>(),
            Err(UnknownDay("Monday".to_string()))
        );
    }

    #[test]
    fn labels_and_selectable_days() {
        assert_eq!(DayToken::Mer.display_label(), "Mercoledì");
        assert_eq!(DayToken::Dom.to_string(), "Dom");
        assert_eq!(selectable_days(false).len(), 6);
        assert_eq!(selectable_days(true).last(), Some(&DayToken::Dom));
    }
}
