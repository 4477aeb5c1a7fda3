//! Date and time types of the engine
//!
//! A `Date` counts days from 31 Dec 1899 (day 0), from 1 Jan 0001 to
//! 31 Dec 9999. Calendar conversions go through the Rata Die, the number
//! of days elapsed since 31 Dec of year 0.
//!
//! A `Time` counts ten-thousandths of second since midnight, exactly like
//! the engine `ISC_TIME`.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::{convert::TryFrom, fmt};

use crate::{ibase, FbError};

/// Rata Die of 31 Dec 1899
const DEC31_1899: i32 = 693595;

/// Days between 17 Nov 1858, the engine day 0, and 31 Dec 1899
const ISC_DATE_OFFSET: i32 = 15019;

const TICKS_PER_SECOND: u32 = ibase::ISC_TIME_SECONDS_PRECISION;
const TICKS_PER_DAY: u32 = 86400 * TICKS_PER_SECOND;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(i32);

impl Date {
    /// 1 Jan 0001
    pub const MIN_DAYS: i32 = -693594;
    /// 31 Dec 9999
    pub const MAX_DAYS: i32 = 2958464;

    pub fn from_days(days: i32) -> Result<Self, FbError> {
        if !(Self::MIN_DAYS..=Self::MAX_DAYS).contains(&days) {
            return Err(FbError::logic("Date::SetDate", "Out of range"));
        }

        Ok(Date(days))
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, FbError> {
        if !(1..=9999).contains(&year) {
            return Err(FbError::logic("Date::SetDate", "Out of range year"));
        }
        if !(1..=12).contains(&month) {
            return Err(FbError::logic("Date::SetDate", "Out of range month"));
        }
        if day < 1 || day > days_in_month(year, month) {
            return Err(FbError::logic("Date::SetDate", "Out of range day"));
        }

        let (mut y, mut m) = (year, month as i32);
        if m < 3 {
            m += 12;
            y -= 1;
        }
        let rata_die = day as i32 + (153 * m - 457) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 306;

        Self::from_days(rata_die - DEC31_1899)
    }

    /// Calendar year, month and day
    pub fn ymd(&self) -> (i32, u32, u32) {
        let z = self.0 + DEC31_1899 + 306;
        let h = 100 * z - 25;
        let a = h / 3652425;
        let b = a - a / 4;
        let mut year = (100 * b + h) / 36525;
        let c = b + z - 365 * year - year / 4;
        let mut month = (5 * c + 456) / 153;
        let day = c - (153 * month - 457) / 5;

        if month > 12 {
            year += 1;
            month -= 12;
        }

        (year, month as u32, day as u32)
    }

    pub fn year(&self) -> i32 {
        self.ymd().0
    }

    pub fn month(&self) -> u32 {
        self.ymd().1
    }

    pub fn day(&self) -> u32 {
        self.ymd().2
    }

    /// Days since 31 Dec 1899
    pub fn days(&self) -> i32 {
        self.0
    }

    pub fn add_days(&self, days: i32) -> Result<Self, FbError> {
        Self::from_days(self.0.saturating_add(days))
    }

    pub fn to_isc(&self) -> ibase::ISC_DATE {
        self.0 + ISC_DATE_OFFSET
    }

    pub fn from_isc(date: ibase::ISC_DATE) -> Self {
        Date(date - ISC_DATE_OFFSET)
    }
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (y, m, d) = self.ymd();
        write!(f, "{:04}-{:02}-{:02}", y, m, d)
    }
}

impl TryFrom<NaiveDate> for Date {
    type Error = FbError;

    fn try_from(date: NaiveDate) -> Result<Self, Self::Error> {
        Date::from_days(date.num_days_from_ce() - DEC31_1899)
    }
}

impl From<Date> for NaiveDate {
    fn from(date: Date) -> Self {
        // Chrono counts days from 1 Jan 0001 as day 1, as the Rata Die does
        NaiveDate::from_num_days_from_ce_opt(date.0 + DEC31_1899).unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(u32);

impl Time {
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Result<Self, FbError> {
        Self::from_hmst(hours, minutes, seconds, 0)
    }

    /// Time from its components, `ticks` in ten-thousandths of second
    pub fn from_hmst(hours: u32, minutes: u32, seconds: u32, ticks: u32) -> Result<Self, FbError> {
        if hours > 23 || minutes > 59 || seconds > 59 || ticks >= TICKS_PER_SECOND {
            return Err(FbError::logic("Time::SetTime", "Out of range time"));
        }

        Ok(Time(
            ((hours * 60 + minutes) * 60 + seconds) * TICKS_PER_SECOND + ticks,
        ))
    }

    pub fn from_ticks(ticks: u32) -> Result<Self, FbError> {
        if ticks >= TICKS_PER_DAY {
            return Err(FbError::logic("Time::SetTime", "Out of range time"));
        }

        Ok(Time(ticks))
    }

    /// Hours, minutes, seconds and ten-thousandths of second
    pub fn hmst(&self) -> (u32, u32, u32, u32) {
        let ticks = self.0 % TICKS_PER_SECOND;
        let seconds = self.0 / TICKS_PER_SECOND;

        (seconds / 3600, (seconds / 60) % 60, seconds % 60, ticks)
    }

    pub fn hours(&self) -> u32 {
        self.hmst().0
    }

    pub fn minutes(&self) -> u32 {
        self.hmst().1
    }

    /// Whole seconds since midnight
    pub fn seconds(&self) -> u32 {
        self.0 / TICKS_PER_SECOND
    }

    /// Ten-thousandths of second since midnight
    pub fn ticks(&self) -> u32 {
        self.0
    }

    pub fn to_isc(&self) -> ibase::ISC_TIME {
        self.0
    }

    /// Engine times out of a day wrap around
    pub fn from_isc(time: ibase::ISC_TIME) -> Self {
        Time(time % TICKS_PER_DAY)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s, t) = self.hmst();
        write!(f, "{:02}:{:02}:{:02}.{:04}", h, m, s, t)
    }
}

impl From<NaiveTime> for Time {
    fn from(time: NaiveTime) -> Self {
        // Leap second nanos go past 1e9
        let ticks = (time.nanosecond() / 100_000).min(TICKS_PER_SECOND - 1);

        Time(time.num_seconds_from_midnight() * TICKS_PER_SECOND + ticks)
    }
}

impl From<Time> for NaiveTime {
    fn from(time: Time) -> Self {
        NaiveTime::from_num_seconds_from_midnight_opt(
            time.seconds(),
            (time.0 % TICKS_PER_SECOND) * 100_000,
        )
        .unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub date: Date,
    pub time: Time,
}

impl Timestamp {
    pub fn new(date: Date, time: Time) -> Self {
        Timestamp { date, time }
    }

    pub fn to_isc(&self) -> ibase::ISC_TIMESTAMP {
        ibase::ISC_TIMESTAMP {
            timestamp_date: self.date.to_isc(),
            timestamp_time: self.time.to_isc(),
        }
    }

    pub fn from_isc(ts: ibase::ISC_TIMESTAMP) -> Self {
        Timestamp {
            date: Date::from_isc(ts.timestamp_date),
            time: Time::from_isc(ts.timestamp_time),
        }
    }
}

impl From<Date> for Timestamp {
    fn from(date: Date) -> Self {
        Timestamp {
            date,
            time: Time::default(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

impl TryFrom<NaiveDateTime> for Timestamp {
    type Error = FbError;

    fn try_from(dt: NaiveDateTime) -> Result<Self, Self::Error> {
        Ok(Timestamp {
            date: Date::try_from(dt.date())?,
            time: Time::from(dt.time()),
        })
    }
}

impl From<Timestamp> for NaiveDateTime {
    fn from(ts: Timestamp) -> Self {
        NaiveDate::from(ts.date).and_time(NaiveTime::from(ts.time))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    #[test]
    fn known_dates() -> Result<(), FbError> {
        assert_eq!(0, Date::from_ymd(1899, 12, 31)?.days());
        assert_eq!(1, Date::from_ymd(1900, 1, 1)?.days());
        assert_eq!(Date::MIN_DAYS, Date::from_ymd(1, 1, 1)?.days());
        assert_eq!(Date::MAX_DAYS, Date::from_ymd(9999, 12, 31)?.days());

        // Engine day 0
        assert_eq!(0, Date::from_ymd(1858, 11, 17)?.to_isc());

        assert_eq!((2000, 2, 29), Date::from_ymd(2000, 2, 29)?.ymd());
        assert_eq!("2021-03-07", Date::from_ymd(2021, 3, 7)?.to_string());

        Ok(())
    }

    #[test]
    fn invalid_dates() {
        assert!(Date::from_ymd(0, 12, 31).is_err());
        assert!(Date::from_ymd(10000, 1, 1).is_err());
        assert!(Date::from_ymd(1900, 2, 29).is_err());
        assert!(Date::from_ymd(2021, 13, 1).is_err());
        assert!(Date::from_ymd(2021, 4, 31).is_err());
        assert!(Date::from_days(Date::MIN_DAYS - 1).is_err());
        assert!(Date::from_days(Date::MAX_DAYS + 1).is_err());
    }

    #[test]
    fn date_round_trip() -> Result<(), FbError> {
        let mut rng = rand::thread_rng();

        for _ in 0..10_000 {
            let year = rng.gen_range(1..=9999);
            let month = rng.gen_range(1..=12);
            let day = rng.gen_range(1..=days_in_month(year, month));

            let date = Date::from_ymd(year, month, day)?;
            assert_eq!((year, month, day), date.ymd());

            let naive = NaiveDate::from(date);
            assert_eq!((year, month, day), (naive.year(), naive.month(), naive.day()));
            assert_eq!(date, Date::try_from(naive)?);
        }

        Ok(())
    }

    #[test]
    fn every_day_round_trips() -> Result<(), FbError> {
        for days in (Date::MIN_DAYS..=Date::MAX_DAYS).step_by(37) {
            let (y, m, d) = Date::from_days(days)?.ymd();
            assert_eq!(days, Date::from_ymd(y, m, d)?.days());
        }

        Ok(())
    }

    #[test]
    fn time_round_trip() -> Result<(), FbError> {
        let mut rng = rand::thread_rng();

        for _ in 0..10_000 {
            let (h, m, s, t) = (
                rng.gen_range(0..24),
                rng.gen_range(0..60),
                rng.gen_range(0..60),
                rng.gen_range(0..10000),
            );

            let time = Time::from_hmst(h, m, s, t)?;
            assert_eq!((h, m, s, t), time.hmst());
            assert_eq!(time, Time::from(NaiveTime::from(time)));
        }

        assert!(Time::from_hms(24, 0, 0).is_err());
        assert!(Time::from_hms(0, 60, 0).is_err());
        assert_eq!(3661, Time::from_hms(1, 1, 1)?.seconds());
        assert_eq!("13:05:09.0250", Time::from_hmst(13, 5, 9, 250)?.to_string());

        Ok(())
    }

    #[test]
    fn timestamps() -> Result<(), FbError> {
        let ts = Timestamp::new(Date::from_ymd(2020, 1, 31)?, Time::from_hms(23, 59, 1)?);

        assert_eq!(ts, Timestamp::from_isc(ts.to_isc()));
        assert_eq!("2020-01-31 23:59:01.0000", ts.to_string());

        let naive = NaiveDateTime::from(ts);
        assert_eq!("2020-01-31 23:59:01", naive.to_string());
        assert_eq!(ts, Timestamp::try_from(naive)?);

        Ok(())
    }
}
