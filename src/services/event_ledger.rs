use uuid::Uuid;

use crate::error::{DirectoryError, DirectoryResult};
use crate::models::event::{normalize_date, normalize_time};
use crate::models::user::normalize_email;
use crate::models::{Event, UserEvent};
use crate::services::group_registry::GroupRegistry;
use crate::services::user_directory::UserDirectory;

/// Local wall-clock stamp, same clock as expiry
const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Events embedded in group documents.
///
/// Expiry pruning happens inside every registry read, so everything returned
/// here is already free of past events.
#[derive(Clone)]
pub struct EventLedger {
    groups: GroupRegistry,
    users: UserDirectory,
}

impl EventLedger {
    pub fn new(groups: GroupRegistry, users: UserDirectory) -> Self {
        Self { groups, users }
    }

    /// Best-effort display name of the creator; lookups never fail the caller
    async fn creator_name(&self, email: &str) -> Option<String> {
        match self.users.get(email).await {
            Ok(Some(user)) => Some(user.full_name).filter(|n| !n.trim().is_empty()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Could not resolve name of {}: {}", email, e);
                None
            }
        }
    }

    /// Create an event in a group. Only organizers may do this.
    pub async fn create(
        &self,
        group_id: &str,
        date: &str,
        time: Option<&str>,
        description: &str,
        creator_email: &str,
    ) -> DirectoryResult<Event> {
        let mut group = self.groups.get(group_id).await?;
        if !group.is_organizer(creator_email) {
            return Err(DirectoryError::authorization_denied(format!(
                "Only organizers of {} can create events",
                group.name
            )));
        }

        let description = description.trim();
        if description.is_empty() {
            return Err(DirectoryError::invalid_input("Event description is required"));
        }
        let date = normalize_date(date)?;
        let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => Some(normalize_time(t)?),
            None => None,
        };

        let now = self.groups.clock().now();
        let event = Event {
            id: Uuid::new_v4().to_string(),
            date,
            time,
            description: description.to_string(),
            created_by_email: normalize_email(creator_email),
            created_by_name: self.creator_name(creator_email).await,
            created_at: now.format(CREATED_AT_FORMAT).to_string(),
        };
        if event.is_expired(now) {
            tracing::debug!("Event {} in {} is already past; the next read prunes it", event.id, group.id);
        }

        group.events.push(event.clone());
        self.groups.save(&group).await?;

        tracing::info!("Created event {} in group {} for {}", event.id, group.id, event.date);
        Ok(event)
    }

    /// Upcoming events of one group, earliest first
    pub async fn list_for_group(&self, group_id: &str) -> DirectoryResult<Vec<Event>> {
        let group = self.groups.get(group_id).await?;
        let mut events = group.events;
        events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(events)
    }

    /// Upcoming events across every group the user belongs to, earliest first
    pub async fn list_for_user(&self, email: &str) -> DirectoryResult<Vec<UserEvent>> {
        let groups = self.groups.list().await?;

        let mut events: Vec<UserEvent> = groups
            .into_iter()
            .filter(|group| group.is_member(email))
            .flat_map(|group| {
                let group_id = group.id;
                let group_name = group.name;
                group.events.into_iter().map(move |event| UserEvent {
                    event,
                    group_id: group_id.clone(),
                    group_name: group_name.clone(),
                })
            })
            .collect();
        events.sort_by(|a, b| a.event.sort_key().cmp(&b.event.sort_key()));
        Ok(events)
    }

    /// Remove an event by id
    pub async fn delete(&self, group_id: &str, event_id: &str) -> DirectoryResult<()> {
        let removed = self
            .groups
            .modify(group_id, |group| {
                let removed = group.remove_event(event_id);
                Ok((removed, removed))
            })
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("Group {} not found", group_id)))?;

        if !removed {
            return Err(DirectoryError::not_found(format!(
                "Event {} not found in group {}",
                event_id, group_id
            )));
        }
        tracing::info!("Deleted event {} from group {}", event_id, group_id);
        Ok(())
    }

    /// Remove an event on behalf of `acting`, who must be an organizer
    pub async fn delete_as(&self, group_id: &str, event_id: &str, acting: &str) -> DirectoryResult<()> {
        let group = self.groups.get(group_id).await?;
        if !group.is_organizer(acting) {
            return Err(DirectoryError::authorization_denied(format!(
                "Only organizers of {} can delete events",
                group.name
            )));
        }
        self.delete(group_id, event_id).await
    }
}
