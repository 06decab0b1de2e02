//! grid.rs — intraday slot mapping
//!
//! - A day is cut into fixed-width slots between a start and an end time of
//!   day (defaults: 05:00–22:00, 5 minutes, 204 slots).
//! - Slot ids are dense `u16` indexes starting at 0 for the slot that begins
//!   at `start`.
//! - `end` is exclusive: a reading stamped exactly at `end` is outside the grid.
//!
//! All math is in minutes since local midnight; seconds are floored away.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Number of minutes in a day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Why a grid definition was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GridError {
    /// Step outside 1..=60 minutes.
    #[error("step must be between 1 and 60 minutes, got {0}")]
    BadStep(u32),
    /// Start is not before end, or one of them is past midnight.
    #[error("grid window {start}..{end} (minutes) is empty or out of range")]
    BadWindow {
        /// Start minute of day.
        start: u32,
        /// End minute of day (exclusive).
        end: u32,
    },
    /// Window length is not a whole number of steps.
    #[error("window of {span} minutes is not a multiple of the {step}-minute step")]
    Misaligned {
        /// Window length in minutes.
        span: u32,
        /// Step in minutes.
        step: u32,
    },
}

/// The daily sampling grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGrid {
    start_minute: u32,
    end_minute: u32,
    step_minutes: u32,
}

impl Default for DailyGrid {
    fn default() -> Self {
        Self {
            start_minute: 5 * 60,
            end_minute: 22 * 60,
            step_minutes: 5,
        }
    }
}

impl DailyGrid {
    /// Build a grid from minute-of-day bounds.
    pub fn new(start_minute: u32, end_minute: u32, step_minutes: u32) -> Result<Self, GridError> {
        if !(1..=60).contains(&step_minutes) {
            return Err(GridError::BadStep(step_minutes));
        }
        if start_minute >= end_minute || end_minute > MINUTES_PER_DAY {
            return Err(GridError::BadWindow {
                start: start_minute,
                end: end_minute,
            });
        }
        let span = end_minute - start_minute;
        if span % step_minutes != 0 {
            return Err(GridError::Misaligned {
                span,
                step: step_minutes,
            });
        }
        Ok(Self {
            start_minute,
            end_minute,
            step_minutes,
        })
    }

    /// Build a grid from times of day. `end` of 00:00 is not accepted.
    pub fn from_times(start: NaiveTime, end: NaiveTime, step_minutes: u32) -> Result<Self, GridError> {
        Self::new(minute_of_day(start), minute_of_day(end), step_minutes)
    }

    /// Re-validate a grid that came from an untrusted source (e.g. a file).
    pub fn validated(self) -> Result<Self, GridError> {
        Self::new(self.start_minute, self.end_minute, self.step_minutes)
    }

    /// Number of slots per day.
    pub fn slots(&self) -> u16 {
        ((self.end_minute - self.start_minute) / self.step_minutes) as u16
    }

    /// Slot width in minutes.
    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    /// Slot containing time of day `t`, or `None` outside the window.
    pub fn interval_of(&self, t: NaiveTime) -> Option<u16> {
        let m = minute_of_day(t);
        if m < self.start_minute || m >= self.end_minute {
            return None;
        }
        Some(((m - self.start_minute) / self.step_minutes) as u16)
    }

    /// Start time of slot `idx`.
    pub fn slot_start(&self, idx: u16) -> Option<NaiveTime> {
        if idx >= self.slots() {
            return None;
        }
        let m = self.start_minute + u32::from(idx) * self.step_minutes;
        NaiveTime::from_hms_opt(m / 60, m % 60, 0)
    }

    /// Whether `idx` addresses a slot of this grid.
    pub fn contains(&self, idx: u16) -> bool {
        idx < self.slots()
    }
}

fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}
