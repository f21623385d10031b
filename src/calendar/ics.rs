//! iCalendar feed rendered from the calendar store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use icalendar::parser::{read_calendar, unfold};
use icalendar::{Calendar, Component, EventLike};

use crate::calendar::error::StoreError;
use crate::calendar::store::CalendarStore;
use crate::fsutil;

pub const ICS_FILE: &str = "SatPass.ics";
pub const PRODID: &str = "-//satpass-notify//Satellite Passes//EN";

/// Render every stored event as a VEVENT, in identity-key order.
pub fn render_calendar(store: &CalendarStore, calendar_name: &str) -> String {
    let mut cal = Calendar::new();
    cal.name(calendar_name);

    for event in store.events() {
        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&event.uid);
        ics_event.summary(&event.summary);
        ics_event.description(&event.description);
        ics_event.add_property("DTSTAMP", utc(event.updated_at));
        ics_event.add_property("LAST-MODIFIED", utc(event.updated_at));
        ics_event.add_property("DTSTART", utc(event.start));
        ics_event.add_property("DTEND", utc(event.end));
        if let Some(location) = &event.location {
            ics_event.location(location);
        }
        if let Some(geo) = &event.geo {
            ics_event.add_property("GEO", geo);
        }
        if let Some(url) = &event.url {
            ics_event.add_property("URL", url);
        }
        cal.push(ics_event.done());
    }

    replace_prodid(&cal.done().to_string())
}

fn utc(t: DateTime<Utc>) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

fn replace_prodid(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
        } else {
            result.push_str(line);
        }
        result.push_str("\r\n");
    }
    result
}

/// Parse `ics` back and check it holds exactly the store's events.
pub fn validate(ics: &str, store: &CalendarStore) -> Result<(), StoreError> {
    let unfolded = unfold(ics);
    let calendar =
        read_calendar(&unfolded).map_err(|e| StoreError::InvalidCalendar(e.to_string()))?;

    let mut uids = Vec::new();
    for component in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        for required in ["UID", "DTSTAMP", "DTSTART", "DTEND", "SUMMARY"] {
            if component.find_prop(required).is_none() {
                return Err(StoreError::InvalidCalendar(format!(
                    "VEVENT without {}",
                    required
                )));
            }
        }
        if let Some(uid) = component.find_prop("UID") {
            uids.push(uid.val.to_string());
        }
    }

    let expected: Vec<String> = store.events().map(|e| e.uid.clone()).collect();
    if uids != expected {
        return Err(StoreError::InvalidCalendar(format!(
            "{} VEVENTs rendered for {} stored events",
            uids.len(),
            expected.len()
        )));
    }
    Ok(())
}

/// The published feed file in the output folder.
pub struct IcsFile {
    path: PathBuf,
}

impl IcsFile {
    pub fn new(dir: &Path) -> Self {
        IcsFile {
            path: dir.join(ICS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replace the published file with already checked content.
    pub fn write(&self, ics: &str) -> Result<(), StoreError> {
        fsutil::write_atomic(&self.path, ics.as_bytes())?;
        log::info!("Published calendar to {}", self.path.display());
        Ok(())
    }
}

/// Render the store and parse the result back before anything is written.
pub fn render_checked(store: &CalendarStore, calendar_name: &str) -> Result<String, StoreError> {
    let ics = render_calendar(store, calendar_name);
    validate(&ics, store)?;
    Ok(ics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::event::CalendarEvent;
    use chrono::{Duration, TimeZone};

    fn store() -> CalendarStore {
        let start = Utc.with_ymd_and_hms(2026, 10, 17, 10, 30, 0).unwrap();
        let mut store = CalendarStore::default();
        for (sat, offset) in [("25544", 0), ("20580", 3)] {
            let start = start + Duration::hours(offset);
            store.upsert(CalendarEvent {
                uid: crate::calendar::event::identity_key(sat, start),
                start,
                end: start + Duration::seconds(245),
                summary: format!("☀️ {}", sat),
                description: "Magnitude : -3.2; Clouds : 12%, low\nWeather : ☀️ Clear, cloudless sky"
                    .to_string(),
                location: Some("KUPT".to_string()),
                geo: Some("33.599000;130.212000".to_string()),
                url: Some("https://www.heavens-above.com/passdetails.aspx?satid=25544&mjd=61331.4".to_string()),
                updated_at: Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap(),
            });
        }
        store
    }

    #[test]
    fn renders_a_parseable_calendar_with_utc_times() {
        let store = store();
        let ics = render_calendar(&store, "Satellite Passes");

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains(&format!("PRODID:{}\r\n", PRODID)));
        assert!(ics.contains("X-WR-CALNAME:Satellite Passes"));
        assert!(ics.contains("UID:25544-20261017T103000Z@satpass"));
        assert!(ics.contains("DTSTART:20261017T103000Z"));
        assert!(ics.contains("DTEND:20261017T103405Z"));
        assert!(ics.contains("DTSTAMP:20261016T000000Z"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        validate(&ics, &store).unwrap();
    }

    #[test]
    fn rendering_is_deterministic() {
        let store = store();
        assert_eq!(
            render_calendar(&store, "Satellite Passes"),
            render_calendar(&store.clone(), "Satellite Passes")
        );
    }

    #[test]
    fn empty_store_is_still_a_valid_calendar() {
        let store = CalendarStore::default();
        let ics = render_calendar(&store, "Satellite Passes");
        assert!(ics.contains("END:VCALENDAR"));
        validate(&ics, &store).unwrap();
    }

    #[test]
    fn validation_catches_missing_events() {
        let ics = render_calendar(&CalendarStore::default(), "Satellite Passes");
        assert!(matches!(
            validate(&ics, &store()),
            Err(StoreError::InvalidCalendar(_))
        ));
    }

    #[test]
    fn write_replaces_the_feed() {
        let dir = tempfile::tempdir().unwrap();
        let file = IcsFile::new(dir.path());
        assert!(!file.exists());
        let ics = render_checked(&store(), "Satellite Passes").unwrap();
        file.write(&ics).unwrap();
        assert!(file.exists());
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content.matches("BEGIN:VEVENT").count(), 2);
    }
}
