//! Auth orchestrator.
//!
//! Composes the account, lockout, token, membership and invitation services
//! behind the entry points the HTTP layer calls. Every entry point runs under
//! the [`RetryPolicy`], so transient store failures are retried a bounded
//! number of times and then surface as `ServiceUnavailable`.
//!
//! A retried write may observe its own earlier, timed-out attempt: a refresh
//! whose rotation committed before the deadline is then reported as reuse and
//! the lineage is revoked. That outcome fails closed.

use std::sync::{Arc, OnceLock};

use chrono::Duration;
use tracing::{debug, info};

use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::{Clock, CredentialHasher, EventSink};
use keyward_core::types::{AccountId, InvitationId, MembershipId, WorkspaceId, normalize_email};
use keyward_entity::account::{Account, AccountStatus};
use keyward_entity::invitation::Invitation;
use keyward_entity::membership::{MemberRole, Membership};
use keyward_entity::token::TokenPair;
use keyward_entity::workspace::Workspace;
use keyward_store::Store;

use super::retry::RetryPolicy;
use crate::account::AccountService;
use crate::invitation::{InvitationManager, InvitationToken};
use crate::jwt::{AccessSubject, Claims};
use crate::lockout::LockoutGuard;
use crate::membership::MembershipManager;
use crate::rbac::{Capability, RbacEnforcer};
use crate::token::TokenService;

/// Plaintext hashed once to give unknown-email logins a digest to verify.
const DUMMY_PASSWORD: &str = "keyward-timing-equaliser";

/// Top-level service for authentication and workspace access control.
#[derive(Clone)]
pub struct AuthOrchestrator {
    store: Store,
    accounts: AccountService,
    lockout: LockoutGuard,
    tokens: TokenService,
    memberships: MembershipManager,
    invitations: InvitationManager,
    hasher: Arc<dyn CredentialHasher>,
    dummy_digest: Arc<OnceLock<Option<String>>>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for AuthOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOrchestrator")
            .field("store", &self.store)
            .field("retry", &self.retry)
            .finish()
    }
}

impl AuthOrchestrator {
    /// Wires every service over one store.
    pub fn new(
        config: &AppConfig,
        store: Store,
        clock: Arc<dyn Clock>,
        hasher: Arc<dyn CredentialHasher>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let tokens = TokenService::new(&config.auth, store.clone(), clock.clone(), sink.clone());
        let lockout = LockoutGuard::new(&config.lockout, store.clone(), clock.clone(), sink.clone());
        let accounts = AccountService::new(
            &config.auth,
            &config.lockout,
            store.clone(),
            hasher.clone(),
            tokens.clone(),
            clock.clone(),
            sink.clone(),
        );
        let memberships =
            MembershipManager::new(store.clone(), RbacEnforcer::new(), clock.clone(), sink.clone());
        let invitations = InvitationManager::new(
            &config.invitation,
            store.clone(),
            memberships.clone(),
            clock,
            sink,
        );

        Self {
            store,
            accounts,
            lockout,
            tokens,
            memberships,
            invitations,
            hasher,
            dummy_digest: Arc::new(OnceLock::new()),
            retry: RetryPolicy::from_config(&config.store.retry),
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    // ── Accounts ────────────────────────────────────────────────────

    /// Registers an account.
    pub async fn register(&self, email: &str, password: &str) -> AppResult<AccountId> {
        self.retry
            .run("register", move || self.accounts.register(email, password))
            .await
    }

    /// Performs the login flow and issues an unscoped token pair:
    ///
    /// 1. Resolve the account by email
    /// 2. Refuse if locked
    /// 3. Verify the password, counting a failure on mismatch
    /// 4. Check the account status
    /// 5. Issue tokens, starting a new lineage
    /// 6. Reset the failure counter
    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        self.retry
            .run("login", move || async move {
                let account = self.authenticate(email, password).await?;
                let subject = AccessSubject::account(account.id, account.email.clone());
                self.complete_login(&account, &subject).await
            })
            .await
    }

    /// Same as [`login`](Self::login), but the access token carries the
    /// caller's workspace and role. `Forbidden` if not a member.
    pub async fn login_to_workspace(
        &self,
        email: &str,
        password: &str,
        workspace_id: WorkspaceId,
    ) -> AppResult<TokenPair> {
        self.retry
            .run("login_to_workspace", move || async move {
                let account = self.authenticate(email, password).await?;
                let role = self
                    .memberships
                    .role_in(workspace_id, account.id)
                    .await?
                    .ok_or_else(|| {
                        AppError::forbidden(format!(
                            "Account {} is not a member of {workspace_id}",
                            account.id
                        ))
                    })?;
                let subject = AccessSubject::account(account.id, account.email.clone())
                    .scoped(workspace_id, role);
                self.complete_login(&account, &subject).await
            })
            .await
    }

    /// Rotates a refresh token.
    ///
    /// The subject is rebuilt from current state: a deactivated account or a
    /// lost workspace membership ends the lineage instead of rotating it.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        self.retry
            .run("refresh", move || async move {
                let record = self.tokens.resolve_refresh(refresh_token).await?;

                let account = self
                    .store
                    .bounded(
                        "account.find_by_id",
                        self.store.accounts().find_by_id(record.account_id),
                    )
                    .await?
                    .filter(|a| a.status.can_login());
                let Some(account) = account else {
                    self.tokens.revoke_lineage(record.lineage_id).await?;
                    return Err(AppError::invalid_token(format!(
                        "Account {} can no longer refresh",
                        record.account_id
                    )));
                };

                let mut subject = AccessSubject::account(account.id, account.email.clone());
                if let Some(workspace_id) = record.workspace_id {
                    match self.memberships.role_in(workspace_id, account.id).await? {
                        Some(role) => subject = subject.scoped(workspace_id, role),
                        None => {
                            self.tokens.revoke_lineage(record.lineage_id).await?;
                            return Err(AppError::invalid_token(format!(
                                "Account {} lost access to {workspace_id}",
                                account.id
                            )));
                        }
                    }
                }

                self.tokens.rotate(&record, &subject).await
            })
            .await
    }

    /// Ends the session a refresh token belongs to. Unknown tokens are a no-op.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        self.retry
            .run("logout", move || self.tokens.revoke(refresh_token))
            .await
    }

    /// Verifies an access token and confirms its lineage is still live.
    pub async fn authorize(&self, access_token: &str) -> AppResult<Claims> {
        let claims = self.tokens.verify_access(access_token)?;
        let lineage_id = claims.lineage_id();
        let active = self
            .retry
            .run("authorize", move || self.tokens.lineage_is_active(lineage_id))
            .await?;
        if !active {
            debug!(account_id = %claims.sub, lineage_id = %lineage_id, "Access token from revoked lineage");
            return Err(AppError::invalid_token(format!(
                "Lineage {lineage_id} was revoked"
            )));
        }
        Ok(claims)
    }

    /// Changes a password and ends every session of the account.
    pub async fn change_password(
        &self,
        account_id: AccountId,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        self.retry
            .run("change_password", move || {
                self.accounts
                    .change_password(account_id, current_password, new_password)
            })
            .await
    }

    /// Moves an account to a new status.
    pub async fn set_account_status(&self, account_id: AccountId, status: AccountStatus) -> AppResult<Account> {
        self.retry
            .run("set_account_status", move || self.accounts.set_status(account_id, status))
            .await
    }

    // ── Workspaces & members ───────────────────────────────────────

    /// Creates a workspace owned by `owner_id`.
    pub async fn create_workspace(&self, name: &str, owner_id: AccountId) -> AppResult<WorkspaceId> {
        self.retry
            .run("create_workspace", move || async move {
                Ok(self.memberships.create_workspace(name, owner_id).await?.id)
            })
            .await
    }

    /// Renames a workspace.
    pub async fn rename_workspace(
        &self,
        workspace_id: WorkspaceId,
        name: &str,
        actor_id: AccountId,
    ) -> AppResult<Workspace> {
        self.retry
            .run("rename_workspace", move || {
                self.memberships.rename_workspace(workspace_id, name, actor_id)
            })
            .await
    }

    /// Soft-deletes a workspace.
    pub async fn delete_workspace(&self, workspace_id: WorkspaceId, actor_id: AccountId) -> AppResult<()> {
        self.retry
            .run("delete_workspace", move || {
                self.memberships.delete_workspace(workspace_id, actor_id)
            })
            .await
    }

    /// Adds an existing account to a workspace.
    pub async fn add_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        role: MemberRole,
        actor_id: AccountId,
    ) -> AppResult<Membership> {
        self.retry
            .run("add_member", move || {
                self.memberships.add_member(workspace_id, user_id, role, actor_id)
            })
            .await
    }

    /// Removes a member.
    pub async fn remove_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        actor_id: AccountId,
    ) -> AppResult<()> {
        self.retry
            .run("remove_member", move || {
                self.memberships.remove_member(workspace_id, user_id, actor_id)
            })
            .await
    }

    /// Changes a member's role.
    pub async fn change_role(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        role: MemberRole,
        actor_id: AccountId,
    ) -> AppResult<Membership> {
        self.retry
            .run("change_role", move || {
                self.memberships.change_role(workspace_id, user_id, role, actor_id)
            })
            .await
    }

    /// Leaves a workspace.
    pub async fn leave_workspace(&self, workspace_id: WorkspaceId, user_id: AccountId) -> AppResult<()> {
        self.retry
            .run("leave_workspace", move || {
                self.memberships.leave_workspace(workspace_id, user_id)
            })
            .await
    }

    /// Lists the members of a workspace.
    pub async fn list_members(&self, workspace_id: WorkspaceId, actor_id: AccountId) -> AppResult<Vec<Membership>> {
        self.retry
            .run("list_members", move || self.memberships.list_members(workspace_id, actor_id))
            .await
    }

    /// Lists the workspaces a user belongs to.
    pub async fn list_workspaces(&self, user_id: AccountId) -> AppResult<Vec<(Workspace, MemberRole)>> {
        self.retry
            .run("list_workspaces", move || self.memberships.list_workspaces(user_id))
            .await
    }

    /// Whether a user holds a capability in a workspace.
    pub async fn check_permission(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        capability: Capability,
    ) -> AppResult<bool> {
        self.retry
            .run("check_permission", move || {
                self.memberships
                    .check_permission(workspace_id, user_id, capability)
            })
            .await
    }

    // ── Invitations ────────────────────────────────────────────────

    /// Invites an email address to a workspace.
    pub async fn invite_member(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
        role: MemberRole,
        actor_id: AccountId,
    ) -> AppResult<InvitationToken> {
        self.retry
            .run("invite_member", move || {
                self.invitations.invite(workspace_id, email, role, actor_id)
            })
            .await
    }

    /// Redeems an invitation token.
    pub async fn accept_invitation(&self, token: &str, user_id: AccountId) -> AppResult<MembershipId> {
        self.retry
            .run("accept_invitation", move || self.invitations.accept(token, user_id))
            .await
    }

    /// Cancels a pending invitation.
    pub async fn cancel_invitation(&self, invitation_id: InvitationId, actor_id: AccountId) -> AppResult<()> {
        self.retry
            .run("cancel_invitation", move || {
                self.invitations.cancel(invitation_id, actor_id)
            })
            .await
    }

    /// Lists invitations that can still be accepted.
    pub async fn list_pending_invitations(
        &self,
        workspace_id: WorkspaceId,
        actor_id: AccountId,
    ) -> AppResult<Vec<Invitation>> {
        self.retry
            .run("list_pending_invitations", move || {
                self.invitations.list_pending(workspace_id, actor_id)
            })
            .await
    }

    // ── Maintenance ────────────────────────────────────────────────

    /// Marks lapsed invitations as expired.
    pub async fn purge_expired_invitations(&self) -> AppResult<u64> {
        self.retry
            .run("purge_expired_invitations", move || self.invitations.purge_expired())
            .await
    }

    /// Deletes refresh-token records expired for longer than `retention`.
    pub async fn purge_refresh_tokens(&self, retention: Duration) -> AppResult<u64> {
        self.retry
            .run("purge_refresh_tokens", move || self.tokens.purge_expired(retention))
            .await
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The account service.
    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    /// The lockout guard.
    pub fn lockout(&self) -> &LockoutGuard {
        &self.lockout
    }

    /// The token service.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// The membership manager.
    pub fn memberships(&self) -> &MembershipManager {
        &self.memberships
    }

    /// The invitation manager.
    pub fn invitations(&self) -> &InvitationManager {
        &self.invitations
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Steps 1-4 of the login flow. Every credential failure is
    /// `InvalidCredentials` with the root cause kept in the message.
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Account> {
        let email = normalize_email(email);
        let Some(account) = self.accounts.find_by_email(&email).await? else {
            self.equalise_timing(password);
            debug!("Login failed: unknown email");
            return Err(AppError::invalid_credentials("No account for email"));
        };

        self.lockout.ensure_unlocked(&account)?;

        if !self.hasher.verify(password, &account.password_hash)? {
            let state = self.lockout.record_failure(account.id).await?;
            info!(
                account_id = %account.id,
                locked = state.is_locked(),
                "Login failed: password mismatch"
            );
            return Err(AppError::invalid_credentials("Password mismatch"));
        }

        match account.status {
            AccountStatus::Active => Ok(account),
            AccountStatus::Deleted => Err(AppError::invalid_credentials("Account deleted")),
            status => {
                info!(account_id = %account.id, status = %status, "Login refused: account not active");
                Err(AppError::forbidden(format!("Account is {status}")))
            }
        }
    }

    /// Steps 5-6 of the login flow.
    async fn complete_login(&self, account: &Account, subject: &AccessSubject) -> AppResult<TokenPair> {
        let pair = self.tokens.issue(subject).await?;
        // Unconditional: `account` may predate a concurrent failure.
        self.lockout.reset(account.id).await?;
        info!(
            account_id = %account.id,
            workspace_id = ?subject.workspace_id,
            "Login successful"
        );
        Ok(pair)
    }

    /// Verifies against a fixed digest so unknown emails cost one hash.
    fn equalise_timing(&self, password: &str) {
        let digest = self
            .dummy_digest
            .get_or_init(|| self.hasher.hash(DUMMY_PASSWORD).ok());
        if let Some(digest) = digest {
            let _ = self.hasher.verify(password, digest);
        }
    }
}
