//! Date, weekday and time-of-day range predicates
//!
//! All three accept an optional trailing `"GMT"` argument. Without it the
//! clock's local offset is used; with it every field is read in UTC.
//! Malformed arguments make the predicate false instead of raising.

use crate::clock::Clock;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, SubsecRound, Timelike};

const WEEKDAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// One argument passed from a script to a range predicate
#[derive(Debug, Clone, PartialEq)]
pub enum RangeArg {
    /// A script number, truncated toward zero
    Number(i64),
    Text(String),
    /// Anything else (booleans, objects, undefined)
    Other,
}

impl RangeArg {
    fn as_number(&self) -> Option<i64> {
        match self {
            RangeArg::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, RangeArg::Text(t) if t.eq_ignore_ascii_case(keyword))
    }
}

impl From<i64> for RangeArg {
    fn from(n: i64) -> Self {
        RangeArg::Number(n)
    }
}

impl From<i32> for RangeArg {
    fn from(n: i32) -> Self {
        RangeArg::Number(n.into())
    }
}

impl From<&str> for RangeArg {
    fn from(s: &str) -> Self {
        RangeArg::Text(s.to_string())
    }
}

/// Strip a trailing "GMT" flag
fn split_gmt(args: &[RangeArg]) -> (&[RangeArg], bool) {
    match args.split_last() {
        Some((last, rest)) if last.is_keyword("GMT") => (rest, true),
        _ => (args, false),
    }
}

fn now_for(clock: &dyn Clock, gmt: bool) -> DateTime<FixedOffset> {
    let now = if gmt { clock.now_gmt() } else { clock.now_local() };
    now.trunc_subsecs(0)
}

fn keyword_index(arg: &RangeArg, keywords: &[&str]) -> Option<u32> {
    match arg {
        RangeArg::Text(t) => keywords
            .iter()
            .position(|k| k.eq_ignore_ascii_case(t))
            .map(|i| i as u32),
        _ => None,
    }
}

/// `weekdayRange(wd1 [, wd2] [, "GMT"])`
///
/// With two weekdays the range runs forward from `wd1` to `wd2` and wraps
/// past Sunday, so `FRI, WED` covers every day except Thursday.
pub fn weekday_range(clock: &dyn Clock, args: &[RangeArg]) -> bool {
    let (args, gmt) = split_gmt(args);
    let today = now_for(clock, gmt).weekday().num_days_from_monday();

    match args {
        [wd] => keyword_index(wd, &WEEKDAYS) == Some(today),
        [wd1, wd2] => match (keyword_index(wd1, &WEEKDAYS), keyword_index(wd2, &WEEKDAYS)) {
            (Some(start), Some(end)) if end < start => start <= today || today <= end,
            (Some(start), Some(end)) => start <= today && today <= end,
            _ => false,
        },
        _ => false,
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Calendar date under construction from `dateRange` arguments.
///
/// Changing the month or year clamps the day to the end of the month;
/// setting a day that the month does not have is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateFields {
    year: i32,
    month: u32,
    day: u32,
}

impl DateFields {
    fn of(date: &DateTime<FixedOffset>) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    fn with_month(self, month: u32) -> Self {
        Self {
            month,
            day: self.day.min(days_in_month(self.year, month)),
            ..self
        }
    }

    fn with_year(self, year: i32) -> Self {
        Self {
            year,
            day: self.day.min(days_in_month(year, self.month)),
            ..self
        }
    }

    /// Apply one argument: a month name, a day (<= 31) or a year
    fn apply(self, arg: &RangeArg) -> Option<Self> {
        match arg {
            RangeArg::Text(_) => keyword_index(arg, &MONTHS).map(|i| self.with_month(i + 1)),
            RangeArg::Number(n) if *n <= 31 => {
                let day = u32::try_from(*n).ok()?;
                if day == 0 || day > days_in_month(self.year, self.month) {
                    return None;
                }
                Some(Self { day, ..self })
            }
            RangeArg::Number(n) => i32::try_from(*n).ok().map(|year| self.with_year(year)),
            RangeArg::Other => None,
        }
    }

    fn at(self, hour: u32, min: u32, sec: u32) -> Option<chrono::NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_opt(hour, min, sec)
    }
}

/// `dateRange(...)` with 1, 2, 4 or 6 date arguments plus optional "GMT".
///
/// The first half of the arguments narrows January 1st 00:00:00 of the
/// current year, the second half narrows December 31st 23:59:59. Day-only
/// pairs are evaluated within the current month. The bounds never wrap, so a
/// descending month pair such as `OCT, AUG` matches nothing.
pub fn date_range(clock: &dyn Clock, args: &[RangeArg]) -> bool {
    let (args, gmt) = split_gmt(args);
    if !matches!(args.len(), 1 | 2 | 4 | 6) {
        return false;
    }

    let now = now_for(clock, gmt);
    let today = DateFields::of(&now);

    if let [arg] = args {
        return today.apply(arg) == Some(today);
    }

    let (first, second) = args.split_at(args.len() / 2);
    let year_start = DateFields {
        year: today.year,
        month: 1,
        day: 1,
    };
    let year_end = DateFields {
        year: today.year,
        month: 12,
        day: 31,
    };
    let start = first.iter().try_fold(year_start, |date, arg| date.apply(arg));
    let end = second.iter().try_fold(year_end, |date, arg| date.apply(arg));
    let (Some(mut start), Some(mut end)) = (start, end) else {
        return false;
    };

    if args.len() == 2 && matches!(args[0], RangeArg::Number(n) if n <= 31) {
        start = start.with_month(today.month);
        end = end.with_month(today.month);
    }

    let (Some(start), Some(end)) = (start.at(0, 0, 0), end.at(23, 59, 59)) else {
        return false;
    };
    let now = now.naive_local();
    start <= now && now <= end
}

fn time_of_day(hour: i64, min: i64, sec: i64) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(
        u32::try_from(hour).ok()?,
        u32::try_from(min).ok()?,
        u32::try_from(sec).ok()?,
    )
}

/// `timeRange(...)` with 1, 2, 4 or 6 numeric arguments plus optional "GMT".
///
/// A range whose end precedes its start crosses midnight: `20, 10` covers
/// 20:00:00 through 10:59:59.
pub fn time_range(clock: &dyn Clock, args: &[RangeArg]) -> bool {
    let (args, gmt) = split_gmt(args);
    let Some(fields) = args.iter().map(RangeArg::as_number).collect::<Option<Vec<_>>>() else {
        return false;
    };
    let now = now_for(clock, gmt).time();

    let bounds = match fields.as_slice() {
        [hour] => return i64::from(now.hour()) == *hour,
        [h1, h2] => (time_of_day(*h1, 0, 0), time_of_day(*h2, 59, 59)),
        [h1, m1, h2, m2] => (time_of_day(*h1, *m1, 0), time_of_day(*h2, *m2, 59)),
        [h1, m1, s1, h2, m2, s2] => (time_of_day(*h1, *m1, *s1), time_of_day(*h2, *m2, *s2)),
        _ => return false,
    };
    let (Some(start), Some(end)) = bounds else {
        return false;
    };

    if end < start {
        now <= end || now >= start
    } else {
        start <= now && now <= end
    }
}
