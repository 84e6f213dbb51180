//! Event catalog bootstrap
//!
//! The catalog is a JSON array of events loaded once at startup:
//! `[{"id": 1, "artist": "...", "venue": "...", "datetime": "...", "count": 100}, ...]`

use std::path::Path;

use box_office_queue::Event;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: u32,
    artist: String,
    venue: String,
    datetime: String,
    count: u32,
}

/// Errors raised while loading the catalog file
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The file could not be read
    #[error("could not read catalog file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a valid catalog
    #[error("could not parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two entries share an event id
    #[error("duplicate event id {0} in catalog")]
    DuplicateId(u32),
}

/// Load the event catalog from `path`
pub fn load(path: &Path) -> Result<Vec<Event>, CatalogError> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)?;

    let mut events = Vec::with_capacity(entries.len());
    for entry in entries {
        if events.iter().any(|e: &Event| e.id == entry.id) {
            return Err(CatalogError::DuplicateId(entry.id));
        }
        events.push(Event {
            id: entry.id,
            artist: entry.artist,
            venue: entry.venue,
            datetime: entry.datetime,
            remaining: entry.count,
        });
    }
    Ok(events)
}
