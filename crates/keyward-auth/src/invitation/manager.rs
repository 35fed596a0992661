//! Invitation manager.
//!
//! Invitations are redeemed with a single-use token. Only the token's SHA-256
//! is stored. Expiry is applied lazily on read and eagerly by the purge sweep.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use keyward_core::config::InvitationConfig;
use keyward_core::error::AppError;
use keyward_core::events::{DomainEvent, WorkspaceEvent};
use keyward_core::result::AppResult;
use keyward_core::traits::{Clock, EventSink};
use keyward_core::types::{AccountId, InvitationId, MembershipId, WorkspaceId, emails_match};
use keyward_entity::invitation::{Invitation, InvitationStatus};
use keyward_entity::membership::{MemberRole, Membership};
use keyward_store::{AcceptOutcome, Store};

use crate::account::service::parse_email;
use crate::membership::MembershipManager;
use crate::rbac::Capability;
use crate::token::secret::{generate_secret, hash_secret};

/// What the inviter hands to the invitee.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationToken {
    /// The invitation id, for cancellation.
    pub invitation_id: InvitationId,
    /// The raw single-use token. Never stored.
    pub token: String,
    /// When the invitation lapses.
    pub expires_at: DateTime<Utc>,
}

/// Issues, redeems and cancels workspace invitations.
#[derive(Debug, Clone)]
pub struct InvitationManager {
    store: Store,
    memberships: MembershipManager,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl InvitationManager {
    /// Creates the manager.
    pub fn new(
        config: &InvitationConfig,
        store: Store,
        memberships: MembershipManager,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            memberships,
            ttl: Duration::days(config.ttl_days as i64),
            clock,
            sink,
        }
    }

    /// Invites `email` to a workspace with `role`.
    ///
    /// `Forbidden` if the inviter lacks `InviteMembers` or may not grant
    /// `role`; `Conflict` if the email already belongs to a member or a live
    /// invitation for the pair exists.
    pub async fn invite(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
        role: MemberRole,
        inviter_id: AccountId,
    ) -> AppResult<InvitationToken> {
        let email = parse_email(email)?;
        let (_, inviter) = self
            .memberships
            .require_permission(workspace_id, inviter_id, Capability::InviteMembers)
            .await?;
        self.memberships
            .enforcer()
            .require_grantable(inviter.role, role)?;

        if let Some(account) = self
            .store
            .bounded("account.find_by_email", self.store.accounts().find_by_email(&email))
            .await?
        {
            if self
                .memberships
                .role_in(workspace_id, account.id)
                .await?
                .is_some()
            {
                return Err(AppError::conflict(format!(
                    "{email} is already a member of {workspace_id}"
                )));
            }
        }

        let now = self.clock.now();
        let token = generate_secret();
        let invitation = Invitation::new(
            workspace_id,
            email,
            role,
            inviter_id,
            hash_secret(&token),
            now,
            self.ttl,
        );
        self.store
            .bounded(
                "invitation.insert_pending",
                self.store.invitations().insert_pending(&invitation, now),
            )
            .await?;

        info!(
            invitation_id = %invitation.id,
            workspace_id = %workspace_id,
            role = %role,
            inviter_id = %inviter_id,
            "Invitation created"
        );
        self.publish(
            inviter_id,
            WorkspaceEvent::InvitationCreated {
                invitation_id: invitation.id.into_uuid(),
                workspace_id: workspace_id.into_uuid(),
                email: invitation.email.clone(),
                role: role.to_string(),
            },
        )
        .await;

        Ok(InvitationToken {
            invitation_id: invitation.id,
            token,
            expires_at: invitation.expires_at,
        })
    }

    /// Redeems an invitation token for `user_id`.
    ///
    /// `NotFound` for an unknown token, `Validation` once expired, `Conflict`
    /// for an accepted or cancelled invitation or an existing member,
    /// `Forbidden` if the user's email differs from the invited one.
    pub async fn accept(&self, token: &str, user_id: AccountId) -> AppResult<MembershipId> {
        let invitation = self
            .store
            .bounded(
                "invitation.find_by_hash",
                self.store.invitations().find_by_hash(&hash_secret(token)),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Unknown invitation token"))?;

        let now = self.clock.now();
        match invitation.effective_status(now) {
            InvitationStatus::Pending => {}
            InvitationStatus::Expired => {
                if invitation.status == InvitationStatus::Pending {
                    self.mark_expired(&invitation, now).await?;
                }
                return Err(AppError::validation(format!(
                    "Invitation {} expired at {}",
                    invitation.id, invitation.expires_at
                )));
            }
            status => {
                return Err(AppError::conflict(format!(
                    "Invitation {} is already {status}",
                    invitation.id
                )));
            }
        }

        let user = self
            .store
            .bounded("account.find_by_id", self.store.accounts().find_by_id(user_id))
            .await?
            .filter(|a| !a.is_deleted())
            .ok_or_else(|| AppError::not_found(format!("Account {user_id} not found")))?;
        if !emails_match(&user.email, &invitation.email) {
            info!(
                invitation_id = %invitation.id,
                user_id = %user_id,
                "Invitation refused: email mismatch"
            );
            return Err(AppError::forbidden(
                "Invitation was issued to a different email address",
            ));
        }

        let accepted = invitation.accepted(user.id, now)?;
        let membership = Membership::new(invitation.workspace_id, user.id, invitation.role, now);
        let outcome = self
            .store
            .bounded(
                "invitation.accept",
                self.store.invitations().accept(&accepted, &membership),
            )
            .await?;

        match outcome {
            AcceptOutcome::Accepted => {}
            AcceptOutcome::NotPending => {
                return Err(AppError::conflict(format!(
                    "Invitation {} is no longer pending",
                    invitation.id
                )));
            }
            AcceptOutcome::AlreadyMember => {
                return Err(AppError::conflict(format!(
                    "User {user_id} is already a member of {}",
                    invitation.workspace_id
                )));
            }
            AcceptOutcome::WorkspaceInactive => {
                return Err(AppError::not_found(format!(
                    "Workspace {} not found",
                    invitation.workspace_id
                )));
            }
        }

        info!(
            invitation_id = %invitation.id,
            workspace_id = %invitation.workspace_id,
            user_id = %user_id,
            role = %invitation.role,
            "Invitation accepted"
        );
        self.publish(
            user_id,
            WorkspaceEvent::InvitationAccepted {
                invitation_id: invitation.id.into_uuid(),
                workspace_id: invitation.workspace_id.into_uuid(),
                user_id: user_id.into_uuid(),
            },
        )
        .await;
        self.publish(
            user_id,
            WorkspaceEvent::MemberAdded {
                workspace_id: invitation.workspace_id.into_uuid(),
                user_id: user_id.into_uuid(),
                role: invitation.role.to_string(),
            },
        )
        .await;
        Ok(membership.id)
    }

    /// Cancels a pending invitation. Requires `InviteMembers`.
    pub async fn cancel(&self, invitation_id: InvitationId, actor_id: AccountId) -> AppResult<()> {
        let invitation = self
            .store
            .bounded(
                "invitation.find_by_id",
                self.store.invitations().find_by_id(invitation_id),
            )
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invitation {invitation_id} not found")))?;

        self.memberships
            .require_permission(invitation.workspace_id, actor_id, Capability::InviteMembers)
            .await?;

        let now = self.clock.now();
        let cancelled = invitation.cancelled(now)?;
        let applied = self
            .store
            .bounded(
                "invitation.transition",
                self.store.invitations().transition(&cancelled),
            )
            .await?;
        if !applied {
            return Err(AppError::conflict(format!(
                "Invitation {invitation_id} is no longer pending"
            )));
        }

        info!(
            invitation_id = %invitation_id,
            workspace_id = %invitation.workspace_id,
            actor_id = %actor_id,
            "Invitation cancelled"
        );
        self.publish(
            actor_id,
            WorkspaceEvent::InvitationCancelled {
                invitation_id: invitation_id.into_uuid(),
                workspace_id: invitation.workspace_id.into_uuid(),
            },
        )
        .await;
        Ok(())
    }

    /// Lists invitations of a workspace that can still be accepted.
    pub async fn list_pending(&self, workspace_id: WorkspaceId, actor_id: AccountId) -> AppResult<Vec<Invitation>> {
        self.memberships
            .require_permission(workspace_id, actor_id, Capability::InviteMembers)
            .await?;

        let now = self.clock.now();
        let pending = self
            .store
            .bounded(
                "invitation.list_pending",
                self.store.invitations().list_pending(workspace_id),
            )
            .await?;
        Ok(pending
            .into_iter()
            .filter(|i| i.is_pending_at(now))
            .collect())
    }

    /// Marks every lapsed pending invitation as expired.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        let now = self.clock.now();
        let expired = self
            .store
            .bounded(
                "invitation.expire_stale",
                self.store.invitations().expire_stale(now),
            )
            .await?;
        info!(expired, "Expired stale invitations");
        Ok(expired)
    }

    async fn mark_expired(&self, invitation: &Invitation, now: DateTime<Utc>) -> AppResult<()> {
        let expired = invitation.expired(now)?;
        let applied = self
            .store
            .bounded(
                "invitation.transition",
                self.store.invitations().transition(&expired),
            )
            .await?;
        debug!(invitation_id = %invitation.id, applied, "Invitation expired lazily");
        Ok(())
    }

    async fn publish(&self, actor_id: AccountId, event: WorkspaceEvent) {
        self.sink
            .publish(DomainEvent::workspace(
                self.clock.now(),
                Some(actor_id.into_uuid()),
                event,
            ))
            .await;
    }
}
