//! DOS date and time words.
//!
//! A FAT timestamp is two 16-bit words: the date packs
//! `(year-1980) << 9 | month << 5 | day` and the time packs
//! `hours << 11 | minutes << 5 | seconds / 2`, so seconds carry
//! two-second resolution and years range 1980..=2107.
//!
//! Calendar arithmetic runs in a March-first Gregorian calendar: shifting
//! the year start to March 1 puts the leap day at the end of the shifted
//! year, which makes both directions straight integer math over 400-year
//! cycles with no month tables.

use std::time::{SystemTime, UNIX_EPOCH};

/// Civil days between 0000-03-01 (the shifted epoch) and 1970-01-01.
const EPOCH_SHIFT_DAYS: i64 = 719_468;
/// Days in one 400-year Gregorian cycle.
const DAYS_PER_ERA: i64 = 146_097;

/// Pack calendar fields into the DOS date word.
pub fn pack_date(year: u32, month: u32, day: u32) -> u16 {
    let dos_year = year.saturating_sub(1980).min(127) as u16;
    (dos_year << 9) | ((month as u16) << 5) | day as u16
}

/// Pack wall-clock fields into the DOS time word.
pub fn pack_time(hours: u32, minutes: u32, seconds: u32) -> u16 {
    ((hours as u16) << 11) | ((minutes as u16) << 5) | (seconds as u16 / 2)
}

/// Unpack the DOS date word into (year, month, day).
pub fn unpack_date(date: u16) -> (u32, u32, u32) {
    (
        1980 + (date >> 9) as u32,
        ((date >> 5) & 0x0F) as u32,
        (date & 0x1F) as u32,
    )
}

/// Unpack the DOS time word into (hours, minutes, seconds).
pub fn unpack_time(time: u16) -> (u32, u32, u32) {
    (
        (time >> 11) as u32,
        ((time >> 5) & 0x3F) as u32,
        ((time & 0x1F) as u32) * 2,
    )
}

/// Unix timestamp for a DOS date+time pair. Returns 0 when the pair is
/// unset or names an impossible calendar date.
pub fn dos_to_unix(date: u16, time: u16) -> u64 {
    if date == 0 && time == 0 {
        return 0;
    }
    let (year, month, day) = unpack_date(date);
    let (hours, minutes, seconds) = unpack_time(time);
    if month == 0 || month > 12 || day == 0 || day > 31 {
        return 0;
    }
    let days = days_since_epoch(year, month, day);
    days as u64 * 86_400 + hours as u64 * 3_600 + minutes as u64 * 60 + seconds as u64
}

/// DOS date+time pair for a Unix timestamp.
pub fn unix_to_dos(ts: u64) -> (u16, u16) {
    if ts == 0 {
        return (0, 0);
    }
    let (year, month, day) = civil_date(ts / 86_400);
    let rest = (ts % 86_400) as u32;
    (
        pack_date(year, month, day),
        pack_time(rest / 3_600, rest % 3_600 / 60, rest % 60),
    )
}

/// Current UTC wall clock as a DOS (date, time) pair.
pub(crate) fn current_dos_datetime() -> (u16, u16) {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    unix_to_dos(ts)
}

/// Days from 1970-01-01 to the given calendar date.
fn days_since_epoch(year: u32, month: u32, day: u32) -> i64 {
    // January and February belong to the previous shifted year.
    let shifted_year = if month > 2 { year as i64 } else { year as i64 - 1 };
    let era = shifted_year.div_euclid(400);
    let year_of_era = shifted_year - era * 400;
    let shifted_month = if month > 2 { month as i64 - 3 } else { month as i64 + 9 };
    let day_of_year = (153 * shifted_month + 2) / 5 + day as i64 - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * DAYS_PER_ERA + day_of_era - EPOCH_SHIFT_DAYS
}

/// Calendar date for a day count since 1970-01-01.
fn civil_date(days: u64) -> (u32, u32, u32) {
    let shifted = days as i64 + EPOCH_SHIFT_DAYS;
    let era = shifted.div_euclid(DAYS_PER_ERA);
    let day_of_era = shifted - era * DAYS_PER_ERA;
    let year_of_era =
        (day_of_era - day_of_era / 1_460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let shifted_month = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * shifted_month + 2) / 5 + 1;
    let (year, month) = if shifted_month < 10 {
        (era * 400 + year_of_era, shifted_month + 3)
    } else {
        (era * 400 + year_of_era + 1, shifted_month - 9)
    };
    (year as u32, month as u32, day as u32)
}
