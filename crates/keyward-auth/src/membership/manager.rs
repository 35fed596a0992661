//! Membership & RBAC manager.
//!
//! Every mutation is scoped to one (workspace, user) pair. The owner
//! invariant (an active workspace always keeps an owner) is enforced by the
//! store's guarded remove/change-role operations.

use std::sync::Arc;

use tracing::{info, warn};

use keyward_core::error::{AppError, ErrorKind};
use keyward_core::events::{DomainEvent, WorkspaceEvent};
use keyward_core::result::AppResult;
use keyward_core::traits::{Clock, EventSink};
use keyward_core::types::{AccountId, WorkspaceId};
use keyward_entity::membership::{MemberRole, Membership};
use keyward_entity::workspace::Workspace;
use keyward_store::{MembershipWrite, Store};

use super::slug::{slugify, with_suffix};
use crate::rbac::{Capability, RbacEnforcer};

/// Slug collisions tolerated before giving up.
const SLUG_ATTEMPTS: usize = 5;

/// Longest accepted workspace name.
const MAX_NAME_LEN: usize = 100;

/// Creates workspaces and manages who holds which role in them.
#[derive(Debug, Clone)]
pub struct MembershipManager {
    store: Store,
    enforcer: RbacEnforcer,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl MembershipManager {
    /// Creates the manager.
    pub fn new(store: Store, enforcer: RbacEnforcer, clock: Arc<dyn Clock>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            enforcer,
            clock,
            sink,
        }
    }

    /// The enforcer in use.
    pub fn enforcer(&self) -> &RbacEnforcer {
        &self.enforcer
    }

    /// Creates a workspace and its owner membership in one step.
    pub async fn create_workspace(&self, name: &str, owner_id: AccountId) -> AppResult<Workspace> {
        let name = validate_name(name)?;
        let owner = self
            .store
            .bounded("account.find_by_id", self.store.accounts().find_by_id(owner_id))
            .await?
            .filter(|a| a.status.can_login())
            .ok_or_else(|| AppError::not_found(format!("Account {owner_id} not found")))?;

        let base = slugify(&name);
        let mut slug = base.clone();
        for attempt in 1..=SLUG_ATTEMPTS {
            let now = self.clock.now();
            let workspace = Workspace::new(name.clone(), slug.clone(), owner.id, now);
            let membership = Membership::new(workspace.id, owner.id, MemberRole::Owner, now);

            match self
                .store
                .bounded(
                    "workspace.create_with_owner",
                    self.store.workspaces().create_with_owner(&workspace, &membership),
                )
                .await
            {
                Ok(()) => {
                    info!(
                        workspace_id = %workspace.id,
                        owner_id = %owner.id,
                        slug = %workspace.slug,
                        "Workspace created"
                    );
                    self.publish(
                        Some(owner.id),
                        WorkspaceEvent::Created {
                            workspace_id: workspace.id.into_uuid(),
                            owner_id: owner.id.into_uuid(),
                            slug: workspace.slug.clone(),
                        },
                    )
                    .await;
                    return Ok(workspace);
                }
                Err(e) if e.kind == ErrorKind::Conflict && attempt < SLUG_ATTEMPTS => {
                    warn!(slug = %slug, attempt, "Workspace slug taken, retrying with suffix");
                    slug = with_suffix(&base);
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::conflict(format!(
            "Could not allocate a unique slug for '{name}'"
        )))
    }

    /// Renames a workspace. Requires `EditWorkspace`.
    pub async fn rename_workspace(
        &self,
        workspace_id: WorkspaceId,
        name: &str,
        actor_id: AccountId,
    ) -> AppResult<Workspace> {
        let name = validate_name(name)?;
        self.require_permission(workspace_id, actor_id, Capability::EditWorkspace)
            .await?;
        let renamed = self
            .store
            .bounded(
                "workspace.rename",
                self.store.workspaces().rename(workspace_id, &name, self.clock.now()),
            )
            .await?
            .ok_or_else(|| AppError::not_found(format!("Workspace {workspace_id} not found")))?;

        info!(workspace_id = %workspace_id, actor_id = %actor_id, "Workspace renamed");
        self.publish(
            Some(actor_id),
            WorkspaceEvent::Renamed {
                workspace_id: workspace_id.into_uuid(),
                name: renamed.name.clone(),
            },
        )
        .await;
        Ok(renamed)
    }

    /// Soft-deletes (archives) a workspace. Requires `DeleteWorkspace`.
    pub async fn delete_workspace(&self, workspace_id: WorkspaceId, actor_id: AccountId) -> AppResult<()> {
        self.require_permission(workspace_id, actor_id, Capability::DeleteWorkspace)
            .await?;
        self.store
            .bounded(
                "workspace.archive",
                self.store.workspaces().archive(workspace_id, self.clock.now()),
            )
            .await?
            .ok_or_else(|| AppError::not_found(format!("Workspace {workspace_id} not found")))?;

        info!(workspace_id = %workspace_id, actor_id = %actor_id, "Workspace deleted");
        self.publish(
            Some(actor_id),
            WorkspaceEvent::Deleted {
                workspace_id: workspace_id.into_uuid(),
            },
        )
        .await;
        Ok(())
    }

    /// Adds an existing account to a workspace.
    ///
    /// `NotFound` if the workspace or user is missing, `Forbidden` if the
    /// actor may not invite or grant `role`, `Conflict` if already a member.
    pub async fn add_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        role: MemberRole,
        actor_id: AccountId,
    ) -> AppResult<Membership> {
        let (_, actor) = self
            .require_permission(workspace_id, actor_id, Capability::InviteMembers)
            .await?;
        self.enforcer.require_grantable(actor.role, role)?;

        let user = self
            .store
            .bounded("account.find_by_id", self.store.accounts().find_by_id(user_id))
            .await?
            .filter(|a| !a.is_deleted())
            .ok_or_else(|| AppError::not_found(format!("Account {user_id} not found")))?;

        let membership = Membership::new(workspace_id, user.id, role, self.clock.now());
        self.store
            .bounded("membership.insert", self.store.memberships().insert(&membership))
            .await?;

        info!(
            workspace_id = %workspace_id,
            user_id = %user_id,
            role = %role,
            actor_id = %actor_id,
            "Member added"
        );
        self.publish(
            Some(actor_id),
            WorkspaceEvent::MemberAdded {
                workspace_id: workspace_id.into_uuid(),
                user_id: user_id.into_uuid(),
                role: role.to_string(),
            },
        )
        .await;
        Ok(membership)
    }

    /// Removes a member. Self-removal is always allowed; otherwise owners may
    /// remove anyone and admins only members and guests. The sole owner can
    /// never be removed.
    pub async fn remove_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        actor_id: AccountId,
    ) -> AppResult<()> {
        let (_, actor) = self
            .require_permission(workspace_id, actor_id, Capability::ReadContent)
            .await?;

        let target = if user_id == actor_id {
            actor
        } else {
            let target = self.find(workspace_id, user_id).await?.ok_or_else(|| {
                AppError::not_found(format!("User {user_id} is not a member of {workspace_id}"))
            })?;
            self.enforcer.require_removable(actor.role, target.role)?;
            target
        };

        let outcome = self
            .store
            .bounded(
                "membership.remove",
                self.store.memberships().remove(workspace_id, user_id, target.role),
            )
            .await?;
        resolve_write(outcome, workspace_id, user_id)?;

        info!(
            workspace_id = %workspace_id,
            user_id = %user_id,
            actor_id = %actor_id,
            "Member removed"
        );
        self.publish(
            Some(actor_id),
            WorkspaceEvent::MemberRemoved {
                workspace_id: workspace_id.into_uuid(),
                user_id: user_id.into_uuid(),
            },
        )
        .await;
        Ok(())
    }

    /// Leaves a workspace.
    pub async fn leave_workspace(&self, workspace_id: WorkspaceId, user_id: AccountId) -> AppResult<()> {
        self.remove_member(workspace_id, user_id, user_id).await
    }

    /// Changes a member's role. Owner-only; never leaves the workspace
    /// without an owner.
    pub async fn change_role(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        new_role: MemberRole,
        actor_id: AccountId,
    ) -> AppResult<Membership> {
        let (_, actor) = self
            .require_permission(workspace_id, actor_id, Capability::ChangeMemberRole)
            .await?;
        self.enforcer.require_grantable(actor.role, new_role)?;

        let target = self.find(workspace_id, user_id).await?.ok_or_else(|| {
            AppError::not_found(format!("User {user_id} is not a member of {workspace_id}"))
        })?;
        if target.role == new_role {
            return Ok(target);
        }

        let now = self.clock.now();
        let outcome = self
            .store
            .bounded(
                "membership.change_role",
                self.store
                    .memberships()
                    .change_role(workspace_id, user_id, target.role, new_role, now),
            )
            .await?;
        let previous = resolve_write(outcome, workspace_id, user_id)?;

        info!(
            workspace_id = %workspace_id,
            user_id = %user_id,
            old_role = %previous.role,
            new_role = %new_role,
            actor_id = %actor_id,
            "Member role changed"
        );
        self.publish(
            Some(actor_id),
            WorkspaceEvent::RoleChanged {
                workspace_id: workspace_id.into_uuid(),
                user_id: user_id.into_uuid(),
                old_role: previous.role.to_string(),
                new_role: new_role.to_string(),
            },
        )
        .await;
        Ok(previous.with_role(new_role, now))
    }

    /// Whether `user_id` holds `capability` in the workspace. A missing,
    /// archived or suspended workspace grants nothing.
    pub async fn check_permission(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        capability: Capability,
    ) -> AppResult<bool> {
        let Some(workspace) = self.find_workspace(workspace_id).await? else {
            return Ok(false);
        };
        if !workspace.is_active() {
            return Ok(false);
        }
        Ok(self
            .find(workspace_id, user_id)
            .await?
            .is_some_and(|m| self.enforcer.has_permission(m.role, capability)))
    }

    /// Loads the active workspace and the actor's membership, failing with
    /// `NotFound` or `Forbidden` unless the actor holds `capability`.
    pub async fn require_permission(
        &self,
        workspace_id: WorkspaceId,
        actor_id: AccountId,
        capability: Capability,
    ) -> AppResult<(Workspace, Membership)> {
        let workspace = self
            .find_workspace(workspace_id)
            .await?
            .filter(Workspace::is_active)
            .ok_or_else(|| AppError::not_found(format!("Workspace {workspace_id} not found")))?;

        let membership = self.find(workspace_id, actor_id).await?.ok_or_else(|| {
            AppError::forbidden(format!("User {actor_id} is not a member of {workspace_id}"))
        })?;
        self.enforcer.require_permission(membership.role, capability)?;
        Ok((workspace, membership))
    }

    /// The user's role in an active workspace, if any.
    pub async fn role_in(&self, workspace_id: WorkspaceId, user_id: AccountId) -> AppResult<Option<MemberRole>> {
        let active = self
            .find_workspace(workspace_id)
            .await?
            .is_some_and(|w| w.is_active());
        if !active {
            return Ok(None);
        }
        Ok(self.find(workspace_id, user_id).await?.map(|m| m.role))
    }

    /// Lists the members of a workspace. Any member may list.
    pub async fn list_members(&self, workspace_id: WorkspaceId, actor_id: AccountId) -> AppResult<Vec<Membership>> {
        self.require_permission(workspace_id, actor_id, Capability::ReadContent)
            .await?;
        self.store
            .bounded(
                "membership.list_by_workspace",
                self.store.memberships().list_by_workspace(workspace_id),
            )
            .await
    }

    /// Lists the active workspaces a user belongs to, with their role.
    pub async fn list_workspaces(&self, user_id: AccountId) -> AppResult<Vec<(Workspace, MemberRole)>> {
        let memberships = self
            .store
            .bounded(
                "membership.list_by_user",
                self.store.memberships().list_by_user(user_id),
            )
            .await?;

        let mut workspaces = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if let Some(workspace) = self
                .find_workspace(membership.workspace_id)
                .await?
                .filter(Workspace::is_active)
            {
                workspaces.push((workspace, membership.role));
            }
        }
        Ok(workspaces)
    }

    async fn find(&self, workspace_id: WorkspaceId, user_id: AccountId) -> AppResult<Option<Membership>> {
        self.store
            .bounded(
                "membership.find",
                self.store.memberships().find(workspace_id, user_id),
            )
            .await
    }

    async fn find_workspace(&self, workspace_id: WorkspaceId) -> AppResult<Option<Workspace>> {
        self.store
            .bounded(
                "workspace.find_by_id",
                self.store.workspaces().find_by_id(workspace_id),
            )
            .await
    }

    async fn publish(&self, actor_id: Option<AccountId>, event: WorkspaceEvent) {
        self.sink
            .publish(DomainEvent::workspace(
                self.clock.now(),
                actor_id.map(AccountId::into_uuid),
                event,
            ))
            .await;
    }
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Workspace name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Workspace name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn resolve_write(outcome: MembershipWrite, workspace_id: WorkspaceId, user_id: AccountId) -> AppResult<Membership> {
    match outcome {
        MembershipWrite::Applied(previous) => Ok(previous),
        MembershipWrite::Missing => Err(AppError::not_found(format!(
            "User {user_id} is not a member of {workspace_id}"
        ))),
        MembershipWrite::Stale => Err(AppError::conflict(
            "Membership changed concurrently; reload and retry",
        )),
        MembershipWrite::LastOwner => Err(AppError::forbidden(
            "A workspace must keep at least one owner",
        )),
    }
}
