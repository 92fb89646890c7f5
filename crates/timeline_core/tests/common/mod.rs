#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use timeline_core::{ActivityRecord, TimelineDay, TimelineStore};

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub fn day() -> TimelineDay {
    TimelineDay::utc(date()).unwrap()
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
}

/// Activity on the test day running `[from, to)` in wall-clock minutes.
pub fn activity(title: &str, from: (u32, u32), to: (u32, u32)) -> ActivityRecord {
    let start = at(from.0, from.1);
    let duration = at(to.0, to.1) - start;
    ActivityRecord::new(
        format!("https://{title}.example.test/page"),
        title,
        start,
        duration.num_seconds(),
        "extension",
    )
}

pub fn insert_all(store: &impl TimelineStore, activities: &[ActivityRecord]) {
    for activity in activities {
        store.insert_activity(activity).unwrap();
    }
}
