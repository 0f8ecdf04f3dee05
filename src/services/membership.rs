use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{DirectoryError, DirectoryResult};
use crate::models::user::normalize_email;
use crate::models::{Group, Role};
use crate::services::group_registry::GroupRegistry;
use crate::services::user_directory::UserDirectory;
use crate::store::StoreError;

/// What a user deletion did to the groups it touched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    /// Groups removed because the user was their only organizer
    pub deleted_groups: Vec<String>,
    /// Groups that dropped the user and survived
    pub updated_groups: Vec<String>,
}

/// A group with its members resolved to display names
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRoster {
    #[serde(flatten)]
    pub group: Group,
    pub member_names: Vec<String>,
}

enum Departure {
    Removed,
    LastOrganizer,
    NotMember,
}

/// Operations that touch users and groups together.
///
/// Membership lives in the group documents. Each user's `group_ids` is a
/// cache refreshed here after the group write succeeds; cache failures are
/// logged and never undo the group change. `rebuild_user_groups` repairs drift.
#[derive(Clone)]
pub struct MembershipCoordinator {
    groups: GroupRegistry,
    users: UserDirectory,
}

impl MembershipCoordinator {
    pub fn new(groups: GroupRegistry, users: UserDirectory) -> Self {
        Self { groups, users }
    }

    async fn link(&self, email: &str, group_id: &str) {
        if let Err(e) = self.users.edit_group_ids(email, |u| u.link_group(group_id)).await {
            tracing::warn!("Could not add {} to group cache of {}: {}", group_id, email, e);
        }
    }

    async fn unlink(&self, email: &str, group_id: &str) {
        if let Err(e) = self.users.edit_group_ids(email, |u| u.unlink_group(group_id)).await {
            tracing::warn!("Could not drop {} from group cache of {}: {}", group_id, email, e);
        }
    }

    async fn require_user(&self, email: &str) -> DirectoryResult<()> {
        match self.users.get(email).await? {
            Some(_) => Ok(()),
            None => Err(DirectoryError::not_found(format!(
                "User {} not found",
                normalize_email(email)
            ))),
        }
    }

    fn require_organizer(&self, group: &Group, acting: &str, action: &str) -> DirectoryResult<()> {
        if group.is_organizer(acting) {
            return Ok(());
        }
        tracing::debug!("{} denied {} on {}", acting, action, group.id);
        Err(DirectoryError::authorization_denied(format!(
            "Only organizers of {} can {}",
            group.name, action
        )))
    }

    /// Create a group with `creator` as its only organizer
    pub async fn create_group(
        &self,
        name: &str,
        description: &str,
        category: &str,
        creator: &str,
    ) -> DirectoryResult<Group> {
        self.require_user(creator).await?;
        let group = self
            .groups
            .create(name, description, category, &[creator.to_string()])
            .await?;
        self.link(creator, &group.id).await;
        Ok(group)
    }

    /// Join as a plain member; false when already a member
    pub async fn join_group(&self, group_id: &str, email: &str) -> DirectoryResult<bool> {
        self.require_user(email).await?;
        self.groups.get(group_id).await?;

        let joined = self.groups.add_member(group_id, email).await?;
        if joined {
            self.link(email, group_id).await;
        }
        Ok(joined)
    }

    /// Leave a group. Organizers must be demoted first; the last organizer
    /// deletes the group instead.
    pub async fn leave_group(&self, group_id: &str, email: &str) -> DirectoryResult<bool> {
        let group = self.groups.get(group_id).await?;
        if group.is_organizer(email) {
            return Err(DirectoryError::invalid_input(format!(
                "{} is an organizer of {}; step down before leaving",
                normalize_email(email),
                group.name
            )));
        }

        let left = self.groups.remove_member(group_id, email).await?;
        if left {
            self.unlink(email, group_id).await;
        }
        Ok(left)
    }

    /// Organizer removes a plain member
    pub async fn expel_member(&self, group_id: &str, email: &str, acting: &str) -> DirectoryResult<bool> {
        let expelled = self.groups.expel_member(group_id, email, acting).await?;
        if expelled {
            self.unlink(email, group_id).await;
        }
        Ok(expelled)
    }

    /// Organizer changes another member's role
    pub async fn change_role(
        &self,
        group_id: &str,
        email: &str,
        role: Role,
        acting: &str,
    ) -> DirectoryResult<bool> {
        let group = self.groups.get(group_id).await?;
        self.require_organizer(&group, acting, "change roles")?;

        match role {
            Role::Organizer => self.groups.promote_to_organizer(group_id, email).await,
            Role::Member => self.groups.demote_from_organizer(group_id, email).await,
        }
    }

    /// Organizer deletes the whole group
    pub async fn delete_group(&self, group_id: &str, acting: &str) -> DirectoryResult<()> {
        let group = self.groups.get(group_id).await?;
        self.require_organizer(&group, acting, "delete the group")?;

        self.groups.delete(group_id).await?;
        for member in &group.members {
            self.unlink(member, group_id).await;
        }
        Ok(())
    }

    /// Remove `email` from one group, using the group's current document
    async fn depart(&self, group_id: &str, email: &str) -> DirectoryResult<Departure> {
        let departure = self
            .groups
            .modify(group_id, |group| {
                if group.is_sole_organizer(email) {
                    return Ok((Departure::LastOrganizer, false));
                }
                if group.remove_participant(email) {
                    Ok((Departure::Removed, true))
                } else {
                    Ok((Departure::NotMember, false))
                }
            })
            .await?;
        Ok(departure.unwrap_or(Departure::NotMember))
    }

    /// Delete a user and everything that depends on them.
    ///
    /// Groups where the user is the only organizer are deleted; other groups
    /// just drop the user. Not atomic: a failure leaves earlier groups
    /// processed, and running the call again finishes the job. Nothing is
    /// touched while an unreadable group still lists the user.
    pub async fn delete_user(&self, email: &str) -> DirectoryResult<CascadeReport> {
        let email = normalize_email(email);
        let mut report = CascadeReport::default();

        let scan = self.groups.scan().await?;
        if let Some((key, _)) = scan
            .unreadable
            .iter()
            .find(|(_, doc)| lists_participant(doc, &email))
        {
            return Err(StoreError::Corrupt {
                path: key.clone(),
                message: format!("group lists {} but cannot be decoded; repair it first", email),
            }
            .into());
        }

        for group in scan.groups {
            if !group.is_member(&email) {
                continue;
            }
            match self.depart(&group.id, &email).await? {
                Departure::LastOrganizer => {
                    match self.groups.delete(&group.id).await {
                        Ok(()) | Err(DirectoryError::NotFound(_)) => {}
                        Err(e) => return Err(e),
                    }
                    for member in group.members.iter().filter(|m| **m != email) {
                        self.unlink(member, &group.id).await;
                    }
                    report.deleted_groups.push(group.id);
                }
                Departure::Removed => report.updated_groups.push(group.id),
                Departure::NotMember => {}
            }
        }

        self.users.delete(&email).await?;
        tracing::info!(
            "Deleted user {}: {} group(s) dissolved, {} group(s) updated",
            email,
            report.deleted_groups.len(),
            report.updated_groups.len()
        );
        Ok(report)
    }

    /// Groups the user belongs to, read from the groups themselves
    pub async fn groups_for_user(&self, email: &str) -> DirectoryResult<Vec<Group>> {
        self.groups.groups_for_member(email).await
    }

    /// Recompute a user's cached group list from the groups; returns the ids
    pub async fn rebuild_user_groups(&self, email: &str) -> DirectoryResult<Vec<String>> {
        let ids: Vec<String> = self
            .groups
            .groups_for_member(email)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();
        if self.users.set_group_ids(email, ids.clone()).await? {
            tracing::info!("Rebuilt group cache of {}", normalize_email(email));
        }
        Ok(ids)
    }

    /// Every group with member emails resolved to names where a user exists
    pub async fn groups_with_member_names(&self) -> DirectoryResult<Vec<GroupRoster>> {
        let groups = self.groups.list().await?;
        let mut names: HashMap<String, String> = HashMap::new();
        let mut rosters = Vec::with_capacity(groups.len());

        for group in groups {
            let mut member_names = Vec::with_capacity(group.members.len());
            for email in &group.members {
                if !names.contains_key(email) {
                    let name = match self.users.get(email).await? {
                        Some(user) => user.display_name().to_string(),
                        None => email.clone(),
                    };
                    names.insert(email.clone(), name);
                }
                member_names.push(names[email].clone());
            }
            rosters.push(GroupRoster {
                group,
                member_names,
            });
        }
        Ok(rosters)
    }
}

/// Whether a raw group document names `email` in any membership list,
/// under current or legacy field names
fn lists_participant(doc: &Value, email: &str) -> bool {
    ["members", "integrantes", "organizers", "organizadores"]
        .iter()
        .filter_map(|field| doc.get(*field).and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .any(|listed| normalize_email(listed) == email)
}
