use std::sync::LazyLock;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use regex::Regex;

use crate::heatmap::{Half, Window};

static REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
^ # anchor to start of string

(?:
  (?: # trailing days, ending today
    (\d+) \s* d(?:ay|ays)?
  ) | (?: # half of a calendar year
    (\d{4}) \s* -? \s* h([12])
  ) | (?: # explicit inclusive range
    (\d{4}-\d{2}-\d{2}) \s* \.\. \s* (\d{4}-\d{2}-\d{2})
  )
)

$ # anchor to end of string
",
    )
    .expect("Could not parse Regex")
});

/// Parses a heatmap window: `365d`, `2025-h1` or `2025-01-01..2025-03-31`.
pub fn parse_window(text: &str, today: NaiveDate) -> Result<Window> {
    let Some(captures) = REGEX.captures(text.trim()) else {
        bail!("could not parse window {text:?}, expected e.g. 365d, 2025-h1 or 2025-01-01..2025-03-31");
    };

    if let Some(days) = captures.get(1) {
        let days = days.as_str().parse()?;
        Window::trailing(today, days)
    } else if let Some(year) = captures.get(2) {
        let half = match &captures[3] {
            "1" => Half::First,
            _ => Half::Second,
        };
        Window::half_year(year.as_str().parse()?, half)
    } else {
        let start = parse_day(&captures[4])?;
        let end = parse_day(&captures[5])?;
        Window::new(start, end)
    }
}

fn parse_day(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|err| anyhow!("invalid date {text:?}: {err}"))
}
