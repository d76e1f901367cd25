//! Conversions between Rust values and their stored SQLite text forms
//!
//! Timestamps are stored as fixed-width UTC RFC 3339 strings with millisecond
//! precision, so comparing the text compares the instants. Dates are stored as
//! `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Stored form of a timestamp
pub fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stored form of an optional timestamp
pub fn opt_ts(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(ts)
}

/// Stored form of a date
pub fn date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// Stored form of an optional date
pub fn opt_date(value: Option<NaiveDate>) -> Option<String> {
    value.map(date)
}

/// Typed getters for the text-encoded column kinds
pub trait RowExt {
    fn timestamp(&self, column: &str) -> rusqlite::Result<DateTime<Utc>>;
    fn opt_timestamp(&self, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>>;
    fn date(&self, column: &str) -> rusqlite::Result<NaiveDate>;
    fn opt_date(&self, column: &str) -> rusqlite::Result<Option<NaiveDate>>;
}

impl RowExt for Row<'_> {
    fn timestamp(&self, column: &str) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = self.get(column)?;
        parse_timestamp(self, column, &raw)
    }

    fn opt_timestamp(&self, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
        self.get::<_, Option<String>>(column)?
            .map(|raw| parse_timestamp(self, column, &raw))
            .transpose()
    }

    fn date(&self, column: &str) -> rusqlite::Result<NaiveDate> {
        let raw: String = self.get(column)?;
        parse_date(self, column, &raw)
    }

    fn opt_date(&self, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
        self.get::<_, Option<String>>(column)?
            .map(|raw| parse_date(self, column, &raw))
            .transpose()
    }
}

fn parse_timestamp(row: &Row<'_>, column: &str, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| conversion_error(row, column, e))
}

fn parse_date(row: &Row<'_>, column: &str, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| conversion_error(row, column, e))
}

fn conversion_error<E>(row: &Row<'_>, column: &str, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let index = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rusqlite::Connection;

    #[test]
    fn test_timestamp_text_orders_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert_eq!(ts(early), "2024-01-09T23:59:59.000Z");
        assert!(ts(early) < ts(late));
    }

    #[test]
    fn test_date_format() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date(d), "2024-03-07");
        assert_eq!(opt_date(None), None);
    }

    #[test]
    fn test_row_ext_reads_stored_values() {
        let conn = Connection::open_in_memory().unwrap();
        let (stamp, day, missing) = conn
            .query_row(
                "SELECT '2024-05-01T08:30:00.250Z' AS at, '2024-05-01' AS day, NULL AS gone",
                [],
                |row| {
                    Ok((
                        row.timestamp("at")?,
                        row.date("day")?,
                        row.opt_timestamp("gone")?,
                    ))
                },
            )
            .unwrap();

        assert_eq!(ts(stamp), "2024-05-01T08:30:00.250Z");
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(missing.is_none());
    }

    #[test]
    fn test_row_ext_reports_bad_text() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT 'yesterday' AS at", [], |row| row.timestamp("at"))
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(0, Type::Text, _)));
    }
}
