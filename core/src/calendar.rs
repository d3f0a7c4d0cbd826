use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// Holiday and working day lookups for a national calendar.
pub trait WorkCalendar {
    fn holidays(&self, year: i32) -> BTreeSet<NaiveDate>;

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays(date.year()).contains(&date)
    }

    fn is_working_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }
}

/// Federal holidays of the United States, including observed days.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnitedStates;

impl UnitedStates {
    fn fixed_holidays(year: i32) -> Vec<NaiveDate> {
        let mut days = vec![ymd(year, 1, 1), ymd(year, 7, 4), ymd(year, 11, 11), ymd(year, 12, 25)];
        if year >= 2021 {
            days.push(ymd(year, 6, 19));
        }
        days.into_iter().flatten().collect()
    }

    fn floating_holidays(year: i32) -> Vec<NaiveDate> {
        let mut days = vec![
            nth_weekday(year, 2, Weekday::Mon, 3),  // Washington's Birthday
            last_weekday(year, 5, Weekday::Mon),    // Memorial Day
            nth_weekday(year, 9, Weekday::Mon, 1),  // Labor Day
            nth_weekday(year, 10, Weekday::Mon, 2), // Columbus Day
            nth_weekday(year, 11, Weekday::Thu, 4), // Thanksgiving
        ];
        if year >= 1986 {
            days.push(nth_weekday(year, 1, Weekday::Mon, 3)); // Martin Luther King Jr. Day
        }
        days.into_iter().flatten().collect()
    }
}

impl WorkCalendar for UnitedStates {
    fn holidays(&self, year: i32) -> BTreeSet<NaiveDate> {
        let mut holidays: BTreeSet<NaiveDate> = Self::floating_holidays(year).into_iter().collect();
        for day in Self::fixed_holidays(year) {
            holidays.insert(day);
            if let Some(observed) = observed(day) {
                // observed days may move into the previous year, see below
                if observed.year() == year {
                    holidays.insert(observed);
                }
            }
        }

        // next New Year's Day on a Saturday is observed on Dec 31st
        if let Some(new_year) = ymd(year + 1, 1, 1) {
            if new_year.weekday() == Weekday::Sat {
                holidays.insert(new_year - Duration::days(1));
            }
        }
        holidays
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn observed(day: NaiveDate) -> Option<NaiveDate> {
    match day.weekday() {
        Weekday::Sat => Some(day - Duration::days(1)),
        Weekday::Sun => Some(day + Duration::days(1)),
        _ => None,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_next = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    let mut day = first_next - Duration::days(1);
    while day.weekday() != weekday {
        day -= Duration::days(1);
    }
    Some(day)
}
