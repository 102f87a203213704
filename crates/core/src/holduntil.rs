// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hold-until windows.
//!
//! `job-hold-until` accepts named windows and absolute wall-clock times;
//! the scheduler computes the next matching instant in local time.

use chrono::{DateTime, Datelike, Local, NaiveTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// A parsed `job-hold-until` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HoldUntil {
    NoHold,
    Indefinite,
    /// 06:00–18:00
    DayTime,
    /// 18:00–06:00
    Night,
    /// 16:00–24:00
    SecondShift,
    /// 00:00–08:00
    ThirdShift,
    /// Saturday and Sunday
    Weekend,
    /// An absolute local wall-clock time
    #[serde(rename = "time")]
    Time { hour: u32, minute: u32, second: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("bad job-hold-until value: {0}")]
pub struct BadHoldUntil(pub String);

impl FromStr for HoldUntil {
    type Err = BadHoldUntil;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-hold" => return Ok(HoldUntil::NoHold),
            "indefinite" => return Ok(HoldUntil::Indefinite),
            "day-time" => return Ok(HoldUntil::DayTime),
            "night" => return Ok(HoldUntil::Night),
            "second-shift" => return Ok(HoldUntil::SecondShift),
            "third-shift" => return Ok(HoldUntil::ThirdShift),
            "weekend" => return Ok(HoldUntil::Weekend),
            _ => {}
        }

        let mut parts = s.split(':');
        let hour = parse_field(parts.next(), s)?;
        let minute = parse_field(parts.next(), s)?;
        let second = match parts.next() {
            Some(sec) => parse_field(Some(sec), s)?,
            None => 0,
        };
        if parts.next().is_some() || hour > 23 || minute > 59 || second > 59 {
            return Err(BadHoldUntil(s.to_string()));
        }
        Ok(HoldUntil::Time { hour, minute, second })
    }
}

fn parse_field(part: Option<&str>, whole: &str) -> Result<u32, BadHoldUntil> {
    part.ok_or_else(|| BadHoldUntil(whole.to_string()))?
        .parse()
        .map_err(|_| BadHoldUntil(whole.to_string()))
}

impl HoldUntil {
    /// Epoch seconds of the next instant the job becomes eligible.
    ///
    /// `None` means no hold; `Some(u64::MAX)` means held indefinitely.
    /// When the current time is already inside the window, the job is
    /// eligible immediately.
    pub fn next_release(&self, now: DateTime<Local>) -> Option<u64> {
        let hour = now.hour();
        match self {
            HoldUntil::NoHold => None,
            HoldUntil::Indefinite => Some(u64::MAX),
            HoldUntil::DayTime => {
                if (6..18).contains(&hour) {
                    Some(now.timestamp() as u64)
                } else {
                    Some(at_hour(now, 6, hour >= 18))
                }
            }
            HoldUntil::Night => {
                if !(6..18).contains(&hour) {
                    Some(now.timestamp() as u64)
                } else {
                    Some(at_hour(now, 18, false))
                }
            }
            HoldUntil::SecondShift => {
                if hour >= 16 {
                    Some(now.timestamp() as u64)
                } else {
                    Some(at_hour(now, 16, false))
                }
            }
            HoldUntil::ThirdShift => {
                if hour < 8 {
                    Some(now.timestamp() as u64)
                } else {
                    Some(at_hour(now, 0, true))
                }
            }
            HoldUntil::Weekend => {
                if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
                    Some(now.timestamp() as u64)
                } else {
                    let days_ahead = Weekday::Sat.num_days_from_monday() as i64
                        - now.weekday().num_days_from_monday() as i64;
                    Some(midnight_plus_days(now, days_ahead))
                }
            }
            HoldUntil::Time { hour: h, minute, second } => {
                let target = NaiveTime::from_hms_opt(*h, *minute, *second)
                    .unwrap_or(NaiveTime::MIN);
                let tomorrow = now.time() > target;
                let date = now.date_naive() + chrono::Days::new(u64::from(tomorrow));
                Some(local_timestamp(date.and_time(target), now))
            }
        }
    }
}

impl std::fmt::Display for HoldUntil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoldUntil::NoHold => f.write_str("no-hold"),
            HoldUntil::Indefinite => f.write_str("indefinite"),
            HoldUntil::DayTime => f.write_str("day-time"),
            HoldUntil::Night => f.write_str("night"),
            HoldUntil::SecondShift => f.write_str("second-shift"),
            HoldUntil::ThirdShift => f.write_str("third-shift"),
            HoldUntil::Weekend => f.write_str("weekend"),
            HoldUntil::Time { hour, minute, second } => {
                write!(f, "{hour:02}:{minute:02}:{second:02}")
            }
        }
    }
}

fn at_hour(now: DateTime<Local>, hour: u32, tomorrow: bool) -> u64 {
    let date = now.date_naive() + chrono::Days::new(u64::from(tomorrow));
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    local_timestamp(date.and_time(time), now)
}

fn midnight_plus_days(now: DateTime<Local>, days: i64) -> u64 {
    let date = now.date_naive() + chrono::Days::new(days.max(0) as u64);
    local_timestamp(date.and_time(NaiveTime::MIN), now)
}

/// Resolve a naive local datetime, falling back to `now` across DST gaps.
fn local_timestamp(naive: chrono::NaiveDateTime, now: DateTime<Local>) -> u64 {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp() as u64)
        .unwrap_or(now.timestamp() as u64)
}

#[cfg(test)]
#[path = "holduntil_tests.rs"]
mod tests;
