// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Conversions for the loosely-typed strings found in index rows: timestamps
//! and relative paths.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use regex::Regex;

static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"^(\d{4}-\d{2}-\d{2})[Tt ](\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?)(?:([Zz])|([+-])(\d{2}):?(\d{2}))?$",
  )
  .unwrap()
});

/// Converts an ISO-8601 date & time string to UTC. Accepts `T` or a space
/// between date and time, optional fractional seconds, and an optional `Z` or
/// `+hh:mm` / `+hhmm` offset. Values without an offset are read as UTC.
pub fn parse_date_time(date_time: &str) -> Result<DateTime<Utc>, String> {
  let caps = DATE_TIME_RE
    .captures(date_time.trim())
    .ok_or(format!("Date Time string `{date_time}` did not match regex."))?;

  let naive = NaiveDateTime::parse_from_str(
    &format!("{}T{}", &caps[1], &caps[2]),
    "%Y-%m-%dT%H:%M:%S%.f",
  )
  .map_err(|e| format!("Unable to parse date & time `{date_time}` ({e})."))?;

  let offset_seconds = match (caps.get(4), caps.get(5), caps.get(6)) {
    (Some(sign), Some(hours), Some(minutes)) => {
      let hours = hours.as_str().parse::<i32>().unwrap_or_default();
      let minutes = minutes.as_str().parse::<i32>().unwrap_or_default();
      let seconds = hours * 3600 + minutes * 60;
      if sign.as_str() == "-" { -seconds } else { seconds }
    }
    _ => 0,
  };

  let offset = FixedOffset::east_opt(offset_seconds)
    .ok_or(format!("Invalid time zone offset in `{date_time}`."))?;

  naive
    .and_local_timezone(offset)
    .single()
    .map(|d| d.with_timezone(&Utc))
    .ok_or(format!("Ambiguous date & time `{date_time}`."))
}

/// Normalizes a relative path to the index key form: POSIX separators, no
/// empty or `.` components.
pub fn normalize_rel(rel: &str) -> String {
  rel
    .replace('\\', "/")
    .split('/')
    .filter(|c| !c.is_empty() && *c != ".")
    .collect::<Vec<_>>()
    .join("/")
}

/// Returns the file name of `rel` without its extension. Leading dots of
/// hidden files are not treated as an extension.
pub fn rel_stem(rel: &str) -> &str {
  let name = rel.rsplit_once('/').map_or(rel, |(_, name)| name);
  match name.rfind('.') {
    Some(i) if i > 0 => &name[..i],
    _ => name,
  }
}

/// Returns the directory part of `rel`, or `""` for files at the album root.
pub fn rel_parent(rel: &str) -> &str {
  rel.rsplit_once('/').map_or("", |(parent, _)| parent)
}
