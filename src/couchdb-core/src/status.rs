//! Status-code to message lookup.
//!
//! Endpoint definitions attach a declarative [`StatusTable`]; anything it
//! does not cover falls back to the canonical HTTP reason phrase, then to
//! [`UNKNOWN_STATUS`].

use reqwest::StatusCode;

pub const UNKNOWN_STATUS: &str = "unknown status";

/// Operation-specific messages keyed by HTTP status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTable(&'static [(u16, &'static str)]);

impl StatusTable {
    pub const EMPTY: StatusTable = StatusTable(&[]);

    pub const fn new(entries: &'static [(u16, &'static str)]) -> Self {
        Self(entries)
    }

    pub fn get(&self, status: u16) -> Option<&'static str> {
        self.0
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, message)| *message)
    }

    pub fn entries(&self) -> &'static [(u16, &'static str)] {
        self.0
    }

    pub fn message_for(&self, status: u16) -> String {
        status_message(self, status)
    }
}

/// Table entry, else canonical reason phrase, else "unknown status"
pub fn status_message(table: &StatusTable, status: u16) -> String {
    table
        .get(status)
        .or_else(|| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|code| code.canonical_reason())
        })
        .unwrap_or(UNKNOWN_STATUS)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOM: StatusTable = StatusTable::new(&[(404, "custom"), (201, "Created - made it")]);

    #[test]
    fn test_table_entry_wins() {
        assert_eq!(status_message(&CUSTOM, 404), "custom");
        assert_eq!(CUSTOM.message_for(201), "Created - made it");
    }

    #[test]
    fn test_falls_back_to_reason_phrase() {
        assert_eq!(status_message(&StatusTable::EMPTY, 404), "Not Found");
        assert_eq!(status_message(&CUSTOM, 412), "Precondition Failed");
        assert_eq!(status_message(&CUSTOM, 200), "OK");
    }

    #[test]
    fn test_unknown_status() {
        assert_eq!(status_message(&StatusTable::EMPTY, 599), UNKNOWN_STATUS);
        assert_eq!(status_message(&CUSTOM, 1000), UNKNOWN_STATUS);
    }
}
