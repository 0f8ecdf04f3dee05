use serde::{Deserialize, Serialize};

use super::category::Category;
use super::event::Event;
use super::user::normalize_email;
use crate::error::{DirectoryError, DirectoryResult};
use crate::store::is_valid_segment;

/// A student interest group.
///
/// Invariants kept by every mutation below:
/// - every organizer is also a member
/// - there is always at least one organizer
/// - `id` never changes after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default, alias = "id_grupo")]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "descripcion")]
    pub description: String,
    #[serde(default, alias = "categoria")]
    pub category: Category,
    #[serde(default, alias = "organizadores")]
    pub organizers: Vec<String>,
    #[serde(default, alias = "integrantes")]
    pub members: Vec<String>,
    #[serde(default, alias = "eventos")]
    pub events: Vec<Event>,
}

/// Role of a member inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Organizer,
}

/// Derive the stable group id from its display name
pub fn derive_group_id(name: &str) -> DirectoryResult<String> {
    let id = name.trim().to_lowercase().replace(' ', "_");
    if !is_valid_segment(&id) {
        return Err(DirectoryError::invalid_input(format!(
            "Group name '{}' cannot be used as an identifier",
            name
        )));
    }
    Ok(id)
}

impl Group {
    /// Build a new group; organizers become the initial members
    pub fn new(
        name: &str,
        description: &str,
        category: Category,
        organizers: &[String],
    ) -> DirectoryResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DirectoryError::invalid_input("Group name is required"));
        }

        let mut normalized: Vec<String> = Vec::with_capacity(organizers.len());
        for email in organizers.iter().map(|e| normalize_email(e)) {
            if !email.is_empty() && !normalized.contains(&email) {
                normalized.push(email);
            }
        }
        if normalized.is_empty() {
            return Err(DirectoryError::invalid_input(
                "A group needs at least one organizer",
            ));
        }

        Ok(Self {
            id: derive_group_id(name)?,
            name: name.to_string(),
            description: description.trim().to_string(),
            category,
            members: normalized.clone(),
            organizers: normalized,
            events: Vec::new(),
        })
    }

    pub fn is_member(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.members.iter().any(|m| *m == email)
    }

    pub fn is_organizer(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.organizers.iter().any(|o| *o == email)
    }

    pub fn is_sole_organizer(&self, email: &str) -> bool {
        self.organizers.len() == 1 && self.is_organizer(email)
    }

    /// Add to members only; false when already a member
    pub fn add_member(&mut self, email: &str) -> bool {
        if self.is_member(email) {
            return false;
        }
        self.members.push(normalize_email(email));
        true
    }

    /// Remove a plain member. Organizers are left alone (false) so that
    /// organizer removal always goes through demotion first.
    pub fn remove_member(&mut self, email: &str) -> bool {
        if self.is_organizer(email) {
            return false;
        }
        let email = normalize_email(email);
        let before = self.members.len();
        self.members.retain(|m| *m != email);
        before != self.members.len()
    }

    /// Remove from both sets regardless of role. Only the cascade uses this,
    /// after checking that another organizer remains.
    pub fn remove_participant(&mut self, email: &str) -> bool {
        let email = normalize_email(email);
        let before = self.members.len() + self.organizers.len();
        self.members.retain(|m| *m != email);
        self.organizers.retain(|o| *o != email);
        before != self.members.len() + self.organizers.len()
    }

    /// Grant the organizer role to an existing member
    pub fn promote(&mut self, email: &str) -> DirectoryResult<bool> {
        if !self.is_member(email) {
            return Err(DirectoryError::invalid_input(format!(
                "{} is not a member of {}",
                email, self.name
            )));
        }
        if self.is_organizer(email) {
            return Ok(false);
        }
        self.organizers.push(normalize_email(email));
        Ok(true)
    }

    /// Revoke the organizer role, keeping membership
    pub fn demote(&mut self, email: &str) -> DirectoryResult<bool> {
        if !self.is_organizer(email) {
            return Ok(false);
        }
        if self.organizers.len() == 1 {
            return Err(DirectoryError::invalid_input(format!(
                "{} is the last organizer of {}",
                email, self.name
            )));
        }
        let email = normalize_email(email);
        self.organizers.retain(|o| *o != email);
        Ok(true)
    }

    /// Apply non-empty fields; returns whether anything changed
    pub fn apply_info(
        &mut self,
        name: Option<&str>,
        description: Option<&str>,
        category: Option<Category>,
    ) -> bool {
        let mut changed = false;
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            if self.name != name {
                self.name = name.to_string();
                changed = true;
            }
        }
        if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
            if self.description != description {
                self.description = description.to_string();
                changed = true;
            }
        }
        if let Some(category) = category {
            if self.category != category {
                self.category = category;
                changed = true;
            }
        }
        changed
    }

    /// Remove an event by id; false when absent
    pub fn remove_event(&mut self, event_id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.id != event_id);
        before != self.events.len()
    }

    /// Organizers non-empty and contained in members
    pub fn is_consistent(&self) -> bool {
        !self.organizers.is_empty() && self.organizers.iter().all(|o| self.members.contains(o))
    }
}
