use chrono::{DateTime, Utc};

/// Mean time from creation to last update, in whole hours (rounded).
///
/// Pairs whose timestamps fail to parse are skipped; an empty sample yields 0.
pub fn average_resolution_hours<'a, I>(samples: I) -> i64
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut total_ms: i64 = 0;
    let mut count: i64 = 0;

    for (created_at, updated_at) in samples {
        let (Ok(created), Ok(updated)) = (
            DateTime::parse_from_rfc3339(created_at),
            DateTime::parse_from_rfc3339(updated_at),
        ) else {
            continue;
        };
        total_ms += (updated - created).num_milliseconds();
        count += 1;
    }

    if count == 0 {
        return 0;
    }

    let hours = total_ms as f64 / count as f64 / 3_600_000.0;
    hours.round() as i64
}

/// Start of the current UTC day.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}
