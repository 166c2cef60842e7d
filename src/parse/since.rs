use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use regex::Regex;

static REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
^ # anchor to start of string

(?:
  (?: # an exact day in ISO format (yyyy-mm-dd)
    (\d{4}-\d{2}-\d{2})
  ) | (?: # a named day relative to the local date
    (today | yesterday)
  ) | (?: # a number of units back from the local date
    (\d+)
    \s*
    (?:
      (d)(?:ay|ays)?
      | (w)(?:k|eek|ks|eeks)?
      | (m)(?:o|onth|os|onths)?
      | (y)(?:r|ear|rs|ears)?
    )
  )
)

$ # anchor to end of string
",
    )
    .expect("Could not parse Regex")
});

/// Parses the start of a history range into the first instant of that local
/// day.  Counts include the current unit, so `1w` means "since Monday" and
/// `2d` means "since yesterday".
pub fn parse_since<Tz>(text: &str, timezone: &Tz, today: NaiveDate) -> Option<DateTime<Utc>>
where
    Tz: TimeZone,
{
    let captures = REGEX.captures(text.trim())?;

    let day = if let Some(date) = captures.get(1) {
        NaiveDate::parse_from_str(date.as_str(), "%Y-%m-%d").ok()?
    } else if let Some(name) = captures.get(2) {
        if name.as_str().eq_ignore_ascii_case("yesterday") {
            today.pred_opt()?
        } else {
            today
        }
    } else {
        let count = captures[3].parse::<u32>().ok()?.saturating_sub(1);
        if captures.get(4).is_some() {
            today.checked_sub_days(Days::new(count.into()))?
        } else if captures.get(5).is_some() {
            let week_start =
                today - Days::new(today.weekday().num_days_from_monday().into());
            week_start.checked_sub_days(Days::new(u64::from(count) * 7))?
        } else if captures.get(6).is_some() {
            today.checked_sub_months(Months::new(count))?.with_day(1)?
        } else {
            NaiveDate::from_ymd_opt(today.year() - i32::try_from(count).ok()?, 1, 1)?
        }
    };

    start_of_day(timezone, day)
}

fn start_of_day<Tz: TimeZone>(timezone: &Tz, day: NaiveDate) -> Option<DateTime<Utc>> {
    let start = timezone
        .from_local_datetime(&day.and_hms_opt(0, 0, 0)?)
        .earliest()?
        .with_timezone(&Utc);
    Some(start)
}
