use std::sync::Arc;

use serde_json::Value;

use crate::clock::Clock;
use crate::error::{DirectoryError, DirectoryResult};
use crate::models::event::prune_expired;
use crate::models::{Category, Group};
use crate::store::{child_path, DocumentStore, StoreError};

/// Result of reading the whole groups collection
#[derive(Debug, Default)]
pub(crate) struct GroupScan {
    pub groups: Vec<Group>,
    /// `(key, raw document)` for entries that do not decode as a group
    pub unreadable: Vec<(String, Value)>,
}

/// Group documents under the groups collection, each carrying its events.
///
/// Every mutation is a read-modify-write of the whole document. Two callers
/// racing on the same group can lose one side's change; callers on different
/// groups never interfere.
#[derive(Clone)]
pub struct GroupRegistry {
    store: Arc<dyn DocumentStore>,
    groups_path: String,
    clock: Arc<dyn Clock>,
}

impl GroupRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, groups_path: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            groups_path: groups_path.into(),
            clock,
        }
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn path(&self, id: &str) -> DirectoryResult<String> {
        child_path(&self.groups_path, id)
            .map_err(|_| DirectoryError::invalid_input(format!("Invalid group id: '{}'", id)))
    }

    /// Decode a stored group, then drop expired events and persist the
    /// result if anything was dropped. The storage key is the id.
    async fn load(&self, key: &str, doc: Value) -> DirectoryResult<Group> {
        let path = self.path(key)?;
        let mut group: Group = serde_json::from_value(doc).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            message: e.to_string(),
        })?;
        if group.id != key {
            if !group.id.is_empty() {
                tracing::debug!("Group stored at {} claims id '{}'; using the key", path, group.id);
            }
            group.id = key.to_string();
        }

        let pruned = prune_expired(&mut group.events, self.clock.now());
        if pruned > 0 {
            tracing::debug!("Pruned {} expired event(s) from {}", pruned, group.id);
            self.write(&path, &group).await?;
        }
        Ok(group)
    }

    async fn write(&self, path: &str, group: &Group) -> DirectoryResult<()> {
        let doc = serde_json::to_value(group).map_err(|e| StoreError::Corrupt {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        self.store.update(path, &doc).await?;
        Ok(())
    }

    pub(crate) async fn save(&self, group: &Group) -> DirectoryResult<()> {
        let path = self.path(&group.id)?;
        self.write(&path, group).await
    }

    /// Fetch one group, pruned; `None` when it does not exist
    pub async fn find(&self, id: &str) -> DirectoryResult<Option<Group>> {
        let path = self.path(id)?;
        match self.store.get(&path).await? {
            Some(doc) => Ok(Some(self.load(id, doc).await?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: &str) -> DirectoryResult<Group> {
        self.find(id)
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("Group {} not found", id)))
    }

    /// Every stored group, pruned and ordered by id, plus the raw documents
    /// that could not be decoded
    pub(crate) async fn scan(&self) -> DirectoryResult<GroupScan> {
        let entries = match self.store.get(&self.groups_path).await? {
            Some(Value::Object(map)) => map,
            Some(_) | None => return Ok(GroupScan::default()),
        };

        let mut scan = GroupScan::default();
        for (key, doc) in entries {
            match self.load(&key, doc.clone()).await {
                Ok(group) => scan.groups.push(group),
                Err(DirectoryError::Store(StoreError::Corrupt { path, message })) => {
                    tracing::warn!("Unreadable group at {}: {}", path, message);
                    scan.unreadable.push((key, doc));
                }
                Err(DirectoryError::InvalidInput(message)) => {
                    tracing::warn!("Unreadable group key {}: {}", key, message);
                    scan.unreadable.push((key, doc));
                }
                Err(e) => return Err(e),
            }
        }
        scan.groups.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(scan)
    }

    /// Every group, pruned, ordered by id. Undecodable entries are skipped.
    pub async fn list(&self) -> DirectoryResult<Vec<Group>> {
        Ok(self.scan().await?.groups)
    }

    /// Groups in which `email` is a member
    pub async fn groups_for_member(&self, email: &str) -> DirectoryResult<Vec<Group>> {
        let groups = self.list().await?;
        Ok(groups.into_iter().filter(|g| g.is_member(email)).collect())
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        category: &str,
        organizers: &[String],
    ) -> DirectoryResult<Group> {
        let category: Category = category.parse()?;
        let group = Group::new(name, description, category, organizers)?;

        let path = self.path(&group.id)?;
        if self.store.get(&path).await?.is_some() {
            return Err(DirectoryError::conflict(format!(
                "A group with id '{}' already exists; choose a different name",
                group.id
            )));
        }

        let doc = serde_json::to_value(&group).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            message: e.to_string(),
        })?;
        self.store.set(&path, &doc).await?;

        tracing::info!("Created group {} ({})", group.id, group.category);
        Ok(group)
    }

    /// Fetch, mutate in memory, write back when `change` reports a change.
    /// Returns `None` when the group does not exist.
    pub(crate) async fn modify<T>(
        &self,
        id: &str,
        change: impl FnOnce(&mut Group) -> DirectoryResult<(T, bool)>,
    ) -> DirectoryResult<Option<T>> {
        let Some(mut group) = self.find(id).await? else {
            return Ok(None);
        };
        let (result, changed) = change(&mut group)?;
        if changed {
            self.save(&group).await?;
        }
        Ok(Some(result))
    }

    /// Partial edit of name, description and category. The id never changes.
    pub async fn update_info(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        category: Option<&str>,
    ) -> DirectoryResult<bool> {
        let category = match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(label) => Some(label.parse::<Category>()?),
            None => None,
        };

        let changed = self
            .modify(id, |group| {
                let changed = group.apply_info(name, description, category);
                Ok((changed, changed))
            })
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("Group {} not found", id)))?;

        if changed {
            tracing::info!("Updated info of group {}", id);
        }
        Ok(changed)
    }

    /// Add a plain member; false when already a member or the group is missing
    pub async fn add_member(&self, id: &str, email: &str) -> DirectoryResult<bool> {
        let added = self
            .modify(id, |group| {
                let added = group.add_member(email);
                Ok((added, added))
            })
            .await?
            .unwrap_or(false);
        if added {
            tracing::info!("Added {} to group {}", email, id);
        }
        Ok(added)
    }

    /// Remove a plain member; false when not a member, when the target is an
    /// organizer (demote first), or when the group is missing
    pub async fn remove_member(&self, id: &str, email: &str) -> DirectoryResult<bool> {
        let removed = self
            .modify(id, |group| {
                let removed = group.remove_member(email);
                Ok((removed, removed))
            })
            .await?
            .unwrap_or(false);
        if removed {
            tracing::info!("Removed {} from group {}", email, id);
        }
        Ok(removed)
    }

    pub async fn promote_to_organizer(&self, id: &str, email: &str) -> DirectoryResult<bool> {
        let promoted = self
            .modify(id, |group| {
                let promoted = group.promote(email)?;
                Ok((promoted, promoted))
            })
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("Group {} not found", id)))?;
        if promoted {
            tracing::info!("Promoted {} to organizer of {}", email, id);
        }
        Ok(promoted)
    }

    pub async fn demote_from_organizer(&self, id: &str, email: &str) -> DirectoryResult<bool> {
        let demoted = self
            .modify(id, |group| {
                let demoted = group.demote(email)?;
                Ok((demoted, demoted))
            })
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("Group {} not found", id)))?;
        if demoted {
            tracing::info!("Demoted {} to member of {}", email, id);
        }
        Ok(demoted)
    }

    /// Remove a non-organizer member on behalf of an organizer
    pub async fn expel_member(&self, id: &str, email: &str, acting: &str) -> DirectoryResult<bool> {
        let expelled = self
            .modify(id, |group| {
                if !group.is_organizer(acting) {
                    return Err(DirectoryError::authorization_denied(format!(
                        "Only organizers of {} can expel members",
                        group.name
                    )));
                }
                if group.is_organizer(email) {
                    return Err(DirectoryError::authorization_denied(format!(
                        "{} is an organizer of {}; demote before removing",
                        email, group.name
                    )));
                }
                let removed = group.remove_member(email);
                Ok((removed, removed))
            })
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("Group {} not found", id)))?;
        if expelled {
            tracing::info!("{} expelled {} from group {}", acting, email, id);
        }
        Ok(expelled)
    }

    pub async fn is_organizer(&self, id: &str, email: &str) -> DirectoryResult<bool> {
        Ok(self
            .find(id)
            .await?
            .map(|g| g.is_organizer(email))
            .unwrap_or(false))
    }

    /// Delete the whole group and its events. Authorization is the caller's job.
    pub async fn delete(&self, id: &str) -> DirectoryResult<()> {
        let path = self.path(id)?;
        if self.store.get(&path).await?.is_none() {
            return Err(DirectoryError::not_found(format!("Group {} not found", id)));
        }
        self.store.delete(&path).await?;
        tracing::info!("Deleted group {}", id);
        Ok(())
    }
}
