//! Simulation calendar constants and period lookups.
//!
//! A simulated year is 365 days of 24 hours starting on the first of
//! January. Weeks are counted from the first day, so the 53rd week holds
//! only the last day of the year.

/// Number of hours in a simulated year.
pub const HOURS_PER_YEAR: usize = 8760;

/// Number of days in a simulated year.
pub const DAYS_PER_YEAR: usize = 365;

/// Number of (possibly partial) weeks in a simulated year.
pub const WEEKS_PER_YEAR: usize = 53;

/// Number of months in a simulated year.
pub const MONTHS_PER_YEAR: usize = 12;

pub const HOURS_PER_DAY: usize = 24;

const DAYS_PER_MONTH: [usize; MONTHS_PER_YEAR] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Day index (0-based) of an hour in the year.
#[inline]
pub fn day_of_hour(hour: usize) -> usize {
    hour / HOURS_PER_DAY
}

/// Week index (0-based) of a day in the year.
#[inline]
pub fn week_of_day(day: usize) -> usize {
    day / 7
}

/// Month index (0-based) of every day of the year.
///
/// # Examples
///
/// ```rust
/// use adqstat::calendar::month_of_day_table;
///
/// let table = month_of_day_table();
/// assert_eq!(table[0], 0);
/// assert_eq!(table[31], 1); // 1st of February
/// assert_eq!(table[364], 11);
/// ```
pub fn month_of_day_table() -> [u8; DAYS_PER_YEAR] {
    let mut table = [0u8; DAYS_PER_YEAR];
    let mut day = 0;
    for (month, &len) in DAYS_PER_MONTH.iter().enumerate() {
        for slot in &mut table[day..day + len] {
            *slot = month as u8;
        }
        day += len;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_is_consistent() {
        assert_eq!(DAYS_PER_MONTH.iter().sum::<usize>(), DAYS_PER_YEAR);
        assert_eq!(DAYS_PER_YEAR * HOURS_PER_DAY, HOURS_PER_YEAR);
        assert_eq!(week_of_day(DAYS_PER_YEAR - 1), WEEKS_PER_YEAR - 1);
    }

    #[test]
    fn test_period_lookups() {
        assert_eq!(day_of_hour(0), 0);
        assert_eq!(day_of_hour(23), 0);
        assert_eq!(day_of_hour(24), 1);
        assert_eq!(week_of_day(6), 0);
        assert_eq!(week_of_day(7), 1);
        let table = month_of_day_table();
        assert_eq!(table[30], 0);
        assert_eq!(table[58], 1);
        assert_eq!(table[59], 2);
    }
}
