// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Date & time builders for tests.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub fn make_date_utc(
  year: i32,
  month: u32,
  day: u32,
  hour: u32,
  min: u32,
  sec: u32,
  sec_frac: u32,
) -> DateTime<Utc> {
  make_date_internal(year, month, day, hour, min, sec, sec_frac)
    .unwrap_or_else(|| {
      panic!("Invalid date & time: {year}-{month}-{day}T{hour}:{min}:{sec}.{sec_frac}Z")
    })
    .and_utc()
}

/// Formats `base` shifted by `offset_ms` as an RFC 3339 UTC string, for
/// building `dt` fields.
pub fn iso_offset(base: &str, offset_ms: i64) -> String {
  let base = DateTime::parse_from_rfc3339(base)
    .unwrap_or_else(|e| panic!("Invalid base date & time `{base}` ({e})."))
    .with_timezone(&Utc);

  (base + chrono::Duration::milliseconds(offset_ms))
    .format("%Y-%m-%dT%H:%M:%S%.3fZ")
    .to_string()
}

fn make_date_internal(
  year: i32,
  month: u32,
  day: u32,
  hour: u32,
  min: u32,
  sec: u32,
  mut sec_frac: u32,
) -> Option<NaiveDateTime> {
  let nano = if sec_frac == 0 {
    0
  } else {
    while sec_frac < 100_000_000 {
      sec_frac *= 10;
    }
    sec_frac
  };

  NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_nano_opt(hour, min, sec, nano))
}
