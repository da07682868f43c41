use chrono::{DateTime, Datelike, Duration, Local, Months, NaiveDate, Timelike};

/// Remaining lifetime split into calendar units, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub years: i32,
    pub months: i32,
    pub weeks: i64,
    pub days: i64,
    pub total_days: i64,
}

impl Countdown {
    fn zero() -> Self {
        Self {
            years: 0,
            months: 0,
            weeks: 0,
            days: 0,
            total_days: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub percentage: f64,
    pub passed: i64,
    pub total: i64,
}

fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    // Feb 29 anchors land on Feb 28 in common years.
    date.checked_add_months(Months::new((years.max(0) as u32) * 12))
        .unwrap_or(date)
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

/// Time left until the end of the configured life expectancy, never
/// negative.
pub fn life_countdown(birthday: NaiveDate, life_expectancy_years: u32, today: NaiveDate) -> Countdown {
    let end = add_years(birthday, life_expectancy_years as i32);
    if end <= today {
        return Countdown::zero();
    }
    let total_days = (end - today).num_days();

    let mut years = end.year() - today.year();
    while years > 0 && add_years(today, years) > end {
        years -= 1;
    }
    let mut cursor = add_years(today, years);

    let mut months = 0;
    while add_months(cursor, 1) <= end {
        cursor = add_months(cursor, 1);
        months += 1;
    }

    let weeks = (end - cursor).num_days() / 7;
    cursor += Duration::weeks(weeks);
    let days = (end - cursor).num_days();

    Countdown {
        years,
        months,
        weeks,
        days,
        total_days,
    }
}

fn anniversary(birthday: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, birthday.month(), 28))
        .unwrap_or(birthday)
}

/// Days until the next birthday. A birthday today counts as a full year
/// out, matching the countdown display.
pub fn next_birthday_countdown(birthday: NaiveDate, today: NaiveDate) -> i64 {
    let this_year = anniversary(birthday, today.year());
    if this_year > today {
        (this_year - today).num_days()
    } else {
        (anniversary(birthday, today.year() + 1) - today).num_days()
    }
}

pub fn next_month_countdown(today: NaiveDate) -> i64 {
    let month_start = today.with_day(1).unwrap_or(today);
    (add_months(month_start, 1) - today).num_days()
}

/// Days until the next Monday; weeks start on Monday.
pub fn next_week_countdown(today: NaiveDate) -> i64 {
    let from_monday = today.weekday().num_days_from_monday() as i64;
    7 - from_monday
}

pub fn year_progress(today: NaiveDate) -> Progress {
    let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    let year_end = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(today);
    span_progress(year_start, year_end, today)
}

pub fn month_progress(today: NaiveDate) -> Progress {
    let month_start = today.with_day(1).unwrap_or(today);
    span_progress(month_start, add_months(month_start, 1), today)
}

pub fn week_progress(today: NaiveDate) -> Progress {
    let from_monday = today.weekday().num_days_from_monday() as i64;
    let week_start = today - Duration::days(from_monday);
    span_progress(week_start, week_start + Duration::days(7), today)
}

/// Share of the current day already gone, in hours.
pub fn day_progress(now: DateTime<Local>) -> Progress {
    let passed_seconds =
        i64::from(now.hour()) * 3600 + i64::from(now.minute()) * 60 + i64::from(now.second());
    let total_seconds = 24 * 3600;
    Progress {
        percentage: clamp_percentage(passed_seconds as f64 / total_seconds as f64 * 100.0),
        passed: passed_seconds / 3600,
        total: 24,
    }
}

fn span_progress(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Progress {
    let total = (end - start).num_days();
    let passed = (today - start).num_days();
    let percentage = if total > 0 {
        clamp_percentage(passed as f64 / total as f64 * 100.0)
    } else {
        0.0
    };
    Progress {
        percentage,
        passed: passed.max(0),
        total,
    }
}

fn clamp_percentage(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
