use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fallback formats tried, in order, when deciding whether an event is over
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// A dated happening owned by exactly one group. Never edited once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "fecha")]
    pub date: String,
    #[serde(default, alias = "hora", skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, alias = "descripcion")]
    pub description: String,
    #[serde(default, alias = "creado_por_email")]
    pub created_by_email: String,
    #[serde(default, alias = "creado_por_nombre", skip_serializing_if = "Option::is_none")]
    pub created_by_name: Option<String>,
    #[serde(default, alias = "creado_en_iso")]
    pub created_at: String,
}

/// An event annotated with the group it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    #[serde(flatten)]
    pub event: Event,
    pub group_id: String,
    pub group_name: String,
}

impl Event {
    /// Instant the event starts, if its stored date can be read at all.
    ///
    /// A missing time counts as midnight; a time that does not parse falls
    /// back to the bare date.
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        let date = self.date.trim();
        if date.is_empty() {
            return None;
        }
        let time = self
            .time
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("00:00");

        let combined = format!("{} {}", date, time);
        DATE_TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(date, DATE_FORMAT)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    /// Strictly in the past. Unparseable events are never expired.
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        matches!(self.starts_at(), Some(at) if at < now)
    }

    /// Ordering key: date then time, compared as strings
    pub fn sort_key(&self) -> (&str, &str) {
        (self.date.as_str(), self.time.as_deref().unwrap_or(""))
    }
}

/// Drop every expired event; returns how many were removed
pub fn prune_expired(events: &mut Vec<Event>, now: NaiveDateTime) -> usize {
    let before = events.len();
    events.retain(|event| !event.is_expired(now));
    before - events.len()
}

/// Validate a `YYYY-MM-DD` date and return it zero-padded
pub fn normalize_date(date: &str) -> DirectoryResult<String> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .map_err(|_| DirectoryError::invalid_input(format!("Invalid event date '{}', expected YYYY-MM-DD", date)))
}

/// Validate an `HH:MM` or `HH:MM:SS` time and return it zero-padded
pub fn normalize_time(time: &str) -> DirectoryResult<String> {
    let time = time.trim();
    if let Ok(t) = NaiveTime::parse_from_str(time, "%H:%M:%S") {
        return Ok(t.format("%H:%M:%S").to_string());
    }
    NaiveTime::parse_from_str(time, "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| DirectoryError::invalid_input(format!("Invalid event time '{}', expected HH:MM", time)))
}
