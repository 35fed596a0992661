//! In-memory store holding every table behind one mutex.
//!
//! Each trait method takes the lock once and performs its check and its
//! writes before releasing it, which gives every operation the same
//! all-or-nothing behaviour the PostgreSQL backend gets from transactions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::types::{
    AccountId, InvitationId, LineageId, RefreshTokenId, WorkspaceId,
};
use keyward_entity::account::Account;
use keyward_entity::invitation::{Invitation, InvitationStatus};
use keyward_entity::membership::{MemberRole, Membership};
use keyward_entity::token::{RefreshTokenRecord, RefreshTokenStatus};
use keyward_entity::workspace::Workspace;

use crate::traits::{
    AcceptOutcome, AccountStore, InvitationStore, MembershipStore, MembershipWrite,
    RefreshTokenStore, RotateOutcome, WorkspaceStore,
};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    tokens: HashMap<RefreshTokenId, RefreshTokenRecord>,
    workspaces: HashMap<WorkspaceId, Workspace>,
    memberships: HashMap<(WorkspaceId, AccountId), Membership>,
    invitations: HashMap<InvitationId, Invitation>,
}

impl Tables {
    fn owner_count(&self, workspace_id: WorkspaceId) -> usize {
        self.memberships
            .values()
            .filter(|m| m.workspace_id == workspace_id && m.role.is_owner())
            .count()
    }

    fn revoke_where<F>(&mut self, now: DateTime<Utc>, pred: F) -> u64
    where
        F: Fn(&RefreshTokenRecord) -> bool,
    {
        let mut revoked = 0;
        for record in self.tokens.values_mut() {
            if record.is_active() && pred(record) {
                *record = record.revoked(now);
                revoked += 1;
            }
        }
        revoked
    }
}

/// Single-process implementation of every store trait.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert(&self, account: &Account) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let taken = tables
            .accounts
            .values()
            .any(|a| !a.is_deleted() && a.email == account.email);
        if taken || tables.accounts.contains_key(&account.id) {
            return Err(AppError::conflict(format!(
                "Email '{}' is already registered",
                account.email
            )));
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AccountId) -> AppResult<Option<Account>> {
        Ok(self.tables.lock().await.accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        Ok(self
            .tables
            .lock()
            .await
            .accounts
            .values()
            .find(|a| !a.is_deleted() && a.email == email)
            .cloned())
    }

    async fn compare_and_swap(&self, updated: &Account, expected_version: i64) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.accounts.get_mut(&updated.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = updated.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(AppError::not_found(format!("Account {} not found", updated.id))),
        }
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.tokens.values().any(|r| r.token_hash == record.token_hash) {
            return Err(AppError::conflict("Refresh token hash collision"));
        }
        tables.tokens.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        Ok(self
            .tables
            .lock()
            .await
            .tokens
            .values()
            .find(|r| r.token_hash == token_hash)
            .cloned())
    }

    async fn rotate(
        &self,
        current: RefreshTokenId,
        successor: &RefreshTokenRecord,
    ) -> AppResult<RotateOutcome> {
        let mut tables = self.tables.lock().await;
        let Some(record) = tables.tokens.get(&current) else {
            return Ok(RotateOutcome::NotActive);
        };
        if !record.is_active() {
            return Ok(RotateOutcome::NotActive);
        }
        let superseded = record.superseded_by(successor.id);
        tables.tokens.insert(current, superseded);
        tables.tokens.insert(successor.id, successor.clone());
        Ok(RotateOutcome::Rotated)
    }

    async fn revoke_lineage(&self, lineage_id: LineageId, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.tables.lock().await;
        Ok(tables.revoke_where(now, |r| r.lineage_id == lineage_id))
    }

    async fn revoke_all_for_account(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut tables = self.tables.lock().await;
        Ok(tables.revoke_where(now, |r| r.account_id == account_id))
    }

    async fn lineage_is_active(&self, lineage_id: LineageId) -> AppResult<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .tokens
            .values()
            .any(|r| r.lineage_id == lineage_id && r.status == RefreshTokenStatus::Active))
    }

    async fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.tokens.len();
        tables.tokens.retain(|_, r| r.expires_at >= cutoff);
        let purged = (before - tables.tokens.len()) as u64;
        debug!(purged, "Purged expired refresh-token records");
        Ok(purged)
    }
}

#[async_trait]
impl WorkspaceStore for MemoryStore {
    async fn create_with_owner(&self, workspace: &Workspace, owner: &Membership) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.workspaces.values().any(|w| w.slug == workspace.slug) {
            return Err(AppError::conflict(format!(
                "Workspace slug '{}' is taken",
                workspace.slug
            )));
        }
        tables.workspaces.insert(workspace.id, workspace.clone());
        tables
            .memberships
            .insert((owner.workspace_id, owner.user_id), owner.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: WorkspaceId) -> AppResult<Option<Workspace>> {
        Ok(self.tables.lock().await.workspaces.get(&id).cloned())
    }

    async fn rename(
        &self,
        id: WorkspaceId,
        name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Workspace>> {
        let mut tables = self.tables.lock().await;
        let Some(stored) = tables.workspaces.get_mut(&id).filter(|w| w.is_active()) else {
            return Ok(None);
        };
        *stored = stored.renamed(name, now);
        Ok(Some(stored.clone()))
    }

    async fn archive(&self, id: WorkspaceId, now: DateTime<Utc>) -> AppResult<Option<Workspace>> {
        let mut tables = self.tables.lock().await;
        let Some(stored) = tables.workspaces.get_mut(&id).filter(|w| w.is_active()) else {
            return Ok(None);
        };
        *stored = stored.archived(now);
        Ok(Some(stored.clone()))
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn insert(&self, membership: &Membership) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let key = (membership.workspace_id, membership.user_id);
        if tables.memberships.contains_key(&key) {
            return Err(AppError::conflict("User is already a member of this workspace"));
        }
        tables.memberships.insert(key, membership.clone());
        Ok(())
    }

    async fn find(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
    ) -> AppResult<Option<Membership>> {
        Ok(self
            .tables
            .lock()
            .await
            .memberships
            .get(&(workspace_id, user_id))
            .cloned())
    }

    async fn list_by_workspace(&self, workspace_id: WorkspaceId) -> AppResult<Vec<Membership>> {
        let tables = self.tables.lock().await;
        let mut members: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.joined_at, m.id));
        Ok(members)
    }

    async fn list_by_user(&self, user_id: AccountId) -> AppResult<Vec<Membership>> {
        let tables = self.tables.lock().await;
        let mut members: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.joined_at, m.id));
        Ok(members)
    }

    async fn change_role(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        expected: MemberRole,
        new_role: MemberRole,
        now: DateTime<Utc>,
    ) -> AppResult<MembershipWrite> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.memberships.get(&(workspace_id, user_id)).cloned() else {
            return Ok(MembershipWrite::Missing);
        };
        if current.role != expected {
            return Ok(MembershipWrite::Stale);
        }
        if current.role.is_owner() && !new_role.is_owner() && tables.owner_count(workspace_id) <= 1 {
            return Ok(MembershipWrite::LastOwner);
        }
        tables
            .memberships
            .insert((workspace_id, user_id), current.with_role(new_role, now));
        Ok(MembershipWrite::Applied(current))
    }

    async fn remove(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        expected: MemberRole,
    ) -> AppResult<MembershipWrite> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.memberships.get(&(workspace_id, user_id)).cloned() else {
            return Ok(MembershipWrite::Missing);
        };
        if current.role != expected {
            return Ok(MembershipWrite::Stale);
        }
        if current.role.is_owner() && tables.owner_count(workspace_id) <= 1 {
            return Ok(MembershipWrite::LastOwner);
        }
        tables.memberships.remove(&(workspace_id, user_id));
        Ok(MembershipWrite::Applied(current))
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn insert_pending(&self, invitation: &Invitation, now: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let mut live = false;
        for stored in tables.invitations.values_mut() {
            if stored.workspace_id != invitation.workspace_id
                || stored.email != invitation.email
                || stored.status != InvitationStatus::Pending
            {
                continue;
            }
            match stored.expired(now) {
                Ok(expired) => *stored = expired,
                Err(_) => live = true,
            }
        }
        if live {
            return Err(AppError::conflict(format!(
                "A pending invitation already exists for '{}'",
                invitation.email
            )));
        }
        tables.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<Invitation>> {
        Ok(self
            .tables
            .lock()
            .await
            .invitations
            .values()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn find_by_id(&self, id: InvitationId) -> AppResult<Option<Invitation>> {
        Ok(self.tables.lock().await.invitations.get(&id).cloned())
    }

    async fn transition(&self, updated: &Invitation) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.invitations.get_mut(&updated.id) {
            Some(stored) if stored.status == InvitationStatus::Pending => {
                *stored = updated.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(AppError::not_found(format!(
                "Invitation {} not found",
                updated.id
            ))),
        }
    }

    async fn accept(
        &self,
        accepted: &Invitation,
        membership: &Membership,
    ) -> AppResult<AcceptOutcome> {
        let mut tables = self.tables.lock().await;
        let pending = tables
            .invitations
            .get(&accepted.id)
            .is_some_and(|i| i.status == InvitationStatus::Pending);
        if !pending {
            return Ok(AcceptOutcome::NotPending);
        }
        let workspace_active = tables
            .workspaces
            .get(&membership.workspace_id)
            .is_some_and(|w| w.is_active());
        if !workspace_active {
            return Ok(AcceptOutcome::WorkspaceInactive);
        }
        let key = (membership.workspace_id, membership.user_id);
        if tables.memberships.contains_key(&key) {
            return Ok(AcceptOutcome::AlreadyMember);
        }
        tables.invitations.insert(accepted.id, accepted.clone());
        tables.memberships.insert(key, membership.clone());
        Ok(AcceptOutcome::Accepted)
    }

    async fn list_pending(&self, workspace_id: WorkspaceId) -> AppResult<Vec<Invitation>> {
        let tables = self.tables.lock().await;
        let mut pending: Vec<Invitation> = tables
            .invitations
            .values()
            .filter(|i| i.workspace_id == workspace_id && i.status == InvitationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|i| (i.created_at, i.id));
        Ok(pending)
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut expired = 0;
        for stored in tables.invitations.values_mut() {
            if let Ok(next) = stored.expired(now) {
                *stored = next;
                expired += 1;
            }
        }
        Ok(expired)
    }
}
