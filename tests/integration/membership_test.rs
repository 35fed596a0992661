//! Integration tests for workspaces, membership and RBAC.

mod helpers;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use helpers::{TestApp, test_config};
use keyward_auth::{Capability, RbacPolicies};
use keyward_core::error::ErrorKind;
use keyward_core::events::WorkspaceEvent;
use keyward_core::result::AppResult;
use keyward_core::types::{AccountId, WorkspaceId};
use keyward_entity::membership::{MemberRole, Membership};
use keyward_entity::workspace::Workspace;
use keyward_store::memory::MemoryStore;
use keyward_store::{Store, WorkspaceStore};

/// A workspace with one user per role.
struct Team {
    workspace: WorkspaceId,
    owner: AccountId,
    admin: AccountId,
    member: AccountId,
    guest: AccountId,
}

async fn team(app: &TestApp) -> Team {
    let (owner, workspace) = app.create_workspace("owner@x.com", "Acme").await;
    let admin = app.create_user("admin@x.com").await;
    let member = app.create_user("member@x.com").await;
    let guest = app.create_user("guest@x.com").await;
    for (user, role) in [
        (admin, MemberRole::Admin),
        (member, MemberRole::Member),
        (guest, MemberRole::Guest),
    ] {
        app.orchestrator
            .add_member(workspace, user, role, owner)
            .await
            .unwrap();
    }
    Team {
        workspace,
        owner,
        admin,
        member,
        guest,
    }
}

async fn owner_count(app: &TestApp, team: &Team) -> usize {
    app.orchestrator
        .list_members(team.workspace, team.member)
        .await
        .unwrap()
        .iter()
        .filter(|m| m.role.is_owner())
        .count()
}

#[tokio::test]
async fn test_create_workspace_makes_creator_owner() {
    let app = TestApp::new();
    let (owner, workspace) = app.create_workspace("owner@x.com", "Acme Corp").await;

    let members = app.orchestrator.list_members(workspace, owner).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, owner);
    assert_eq!(members[0].role, MemberRole::Owner);

    let workspaces = app.orchestrator.list_workspaces(owner).await.unwrap();
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0].0.slug, "acme-corp");
    assert_eq!(workspaces[0].1, MemberRole::Owner);

    assert!(
        app.events
            .workspace()
            .iter()
            .any(|e| matches!(e, WorkspaceEvent::Created { .. }))
    );
}

#[tokio::test]
async fn test_same_name_gets_distinct_slug() {
    let app = TestApp::new();
    let (owner, first) = app.create_workspace("owner@x.com", "Acme").await;
    let second = app.orchestrator.create_workspace("Acme", owner).await.unwrap();
    assert_ne!(first, second);

    let slugs: Vec<String> = app
        .orchestrator
        .list_workspaces(owner)
        .await
        .unwrap()
        .into_iter()
        .map(|(w, _)| w.slug)
        .collect();
    assert_eq!(slugs.len(), 2);
    assert_ne!(slugs[0], slugs[1]);
}

#[tokio::test]
async fn test_create_workspace_validation() {
    let app = TestApp::new();
    let owner = app.create_user("owner@x.com").await;

    let err = app.orchestrator.create_workspace("   ", owner).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = app
        .orchestrator
        .create_workspace("Acme", AccountId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_add_member_failures() {
    let app = TestApp::new();
    let t = team(&app).await;
    let carol = app.create_user("carol@x.com").await;

    let err = app
        .orchestrator
        .add_member(WorkspaceId::new(), carol, MemberRole::Member, t.owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .orchestrator
        .add_member(t.workspace, AccountId::new(), MemberRole::Member, t.owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .orchestrator
        .add_member(t.workspace, carol, MemberRole::Guest, t.member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let err = app
        .orchestrator
        .add_member(t.workspace, t.member, MemberRole::Member, t.owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_admin_cannot_grant_above_own_role() {
    let app = TestApp::new();
    let t = team(&app).await;
    let carol = app.create_user("carol@x.com").await;

    let err = app
        .orchestrator
        .add_member(t.workspace, carol, MemberRole::Owner, t.admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let added = app
        .orchestrator
        .add_member(t.workspace, carol, MemberRole::Admin, t.admin)
        .await
        .unwrap();
    assert_eq!(added.role, MemberRole::Admin);
}

#[tokio::test]
async fn test_check_permission_follows_role_table() {
    let app = TestApp::new();
    let t = team(&app).await;
    let policies = RbacPolicies::new();

    for (user, role) in [
        (t.owner, MemberRole::Owner),
        (t.admin, MemberRole::Admin),
        (t.member, MemberRole::Member),
        (t.guest, MemberRole::Guest),
    ] {
        for capability in Capability::ALL {
            let allowed = app
                .orchestrator
                .check_permission(t.workspace, user, capability)
                .await
                .unwrap();
            assert_eq!(
                allowed,
                role.has_at_least(&policies.minimum_role(capability)),
                "{role} / {capability}"
            );
        }
    }

    let outsider = app.create_user("outsider@x.com").await;
    assert!(
        !app.orchestrator
            .check_permission(t.workspace, outsider, Capability::ReadContent)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_higher_roles_hold_every_lower_capability() {
    let app = TestApp::new();
    let t = team(&app).await;
    let ranked = [t.owner, t.admin, t.member, t.guest];

    for capability in Capability::ALL {
        let mut lower_allowed = false;
        for user in ranked.iter().rev() {
            let allowed = app
                .orchestrator
                .check_permission(t.workspace, *user, capability)
                .await
                .unwrap();
            assert!(allowed || !lower_allowed, "monotonicity broken for {capability}");
            lower_allowed |= allowed;
        }
    }
}

#[tokio::test]
async fn test_sole_owner_cannot_be_removed_or_demoted() {
    let app = TestApp::new();
    let t = team(&app).await;

    let err = app
        .orchestrator
        .remove_member(t.workspace, t.owner, t.owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let err = app
        .orchestrator
        .leave_workspace(t.workspace, t.owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let err = app
        .orchestrator
        .change_role(t.workspace, t.owner, MemberRole::Admin, t.owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let err = app
        .orchestrator
        .remove_member(t.workspace, t.owner, t.admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    assert_eq!(owner_count(&app, &t).await, 1);
}

#[tokio::test]
async fn test_owner_can_leave_once_another_owner_exists() {
    let app = TestApp::new();
    let t = team(&app).await;

    app.orchestrator
        .change_role(t.workspace, t.admin, MemberRole::Owner, t.owner)
        .await
        .unwrap();
    app.orchestrator
        .leave_workspace(t.workspace, t.owner)
        .await
        .unwrap();

    let role = app
        .orchestrator
        .memberships()
        .role_in(t.workspace, t.owner)
        .await
        .unwrap();
    assert!(role.is_none());
    assert_eq!(owner_count(&app, &t).await, 1);
}

#[tokio::test]
async fn test_removal_rules_by_role() {
    let app = TestApp::new();
    let t = team(&app).await;
    let second_admin = app.create_user("admin2@x.com").await;
    app.orchestrator
        .add_member(t.workspace, second_admin, MemberRole::Admin, t.owner)
        .await
        .unwrap();

    let err = app
        .orchestrator
        .remove_member(t.workspace, second_admin, t.admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let err = app
        .orchestrator
        .remove_member(t.workspace, t.guest, t.member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    app.orchestrator
        .remove_member(t.workspace, t.guest, t.admin)
        .await
        .unwrap();
    app.orchestrator
        .leave_workspace(t.workspace, t.member)
        .await
        .unwrap();
    app.orchestrator
        .remove_member(t.workspace, second_admin, t.owner)
        .await
        .unwrap();

    let err = app
        .orchestrator
        .remove_member(t.workspace, t.guest, t.owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let members = app.orchestrator.list_members(t.workspace, t.owner).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_change_role_is_owner_only() {
    let app = TestApp::new();
    let t = team(&app).await;

    let err = app
        .orchestrator
        .change_role(t.workspace, t.member, MemberRole::Guest, t.admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let updated = app
        .orchestrator
        .change_role(t.workspace, t.member, MemberRole::Guest, t.owner)
        .await
        .unwrap();
    assert_eq!(updated.role, MemberRole::Guest);
    assert!(app.events.workspace().iter().any(|e| matches!(
        e,
        WorkspaceEvent::RoleChanged { old_role, new_role, .. }
            if old_role == "member" && new_role == "guest"
    )));
}

#[tokio::test]
async fn test_rename_and_delete_workspace() {
    let app = TestApp::new();
    let t = team(&app).await;

    let renamed = app
        .orchestrator
        .rename_workspace(t.workspace, "Acme Labs", t.admin)
        .await
        .unwrap();
    assert_eq!(renamed.name, "Acme Labs");

    let err = app
        .orchestrator
        .rename_workspace(t.workspace, "Nope", t.member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let err = app
        .orchestrator
        .delete_workspace(t.workspace, t.admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    app.orchestrator
        .delete_workspace(t.workspace, t.owner)
        .await
        .unwrap();

    assert!(
        !app.orchestrator
            .check_permission(t.workspace, t.owner, Capability::ReadContent)
            .await
            .unwrap()
    );
    assert!(app.orchestrator.list_workspaces(t.owner).await.unwrap().is_empty());

    let carol = app.create_user("carol@x.com").await;
    let err = app
        .orchestrator
        .add_member(t.workspace, carol, MemberRole::Member, t.owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_owner_departures_keep_an_owner() {
    let app = TestApp::new();
    let t = team(&app).await;
    app.orchestrator
        .change_role(t.workspace, t.admin, MemberRole::Owner, t.owner)
        .await
        .unwrap();

    let a = {
        let orchestrator = app.orchestrator.clone();
        let (workspace, user) = (t.workspace, t.owner);
        tokio::spawn(async move { orchestrator.leave_workspace(workspace, user).await })
    };
    let b = {
        let orchestrator = app.orchestrator.clone();
        let (workspace, user) = (t.workspace, t.admin);
        tokio::spawn(async move { orchestrator.leave_workspace(workspace, user).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    let members = app
        .orchestrator
        .memberships()
        .list_members(t.workspace, t.member)
        .await
        .unwrap();
    assert_eq!(members.iter().filter(|m| m.role.is_owner()).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mutual_demotion_keeps_an_owner() {
    let app = TestApp::new();
    let t = team(&app).await;
    app.orchestrator
        .change_role(t.workspace, t.admin, MemberRole::Owner, t.owner)
        .await
        .unwrap();

    let a = {
        let orchestrator = app.orchestrator.clone();
        let (workspace, target, actor) = (t.workspace, t.admin, t.owner);
        tokio::spawn(async move {
            orchestrator
                .change_role(workspace, target, MemberRole::Member, actor)
                .await
        })
    };
    let b = {
        let orchestrator = app.orchestrator.clone();
        let (workspace, target, actor) = (t.workspace, t.owner, t.admin);
        tokio::spawn(async move {
            orchestrator
                .change_role(workspace, target, MemberRole::Member, actor)
                .await
        })
    };
    let _ = (a.await.unwrap(), b.await.unwrap());

    let members = app
        .orchestrator
        .memberships()
        .list_members(t.workspace, t.member)
        .await
        .unwrap();
    assert!(members.iter().any(|m| m.role.is_owner()));
}

/// Workspace store that parks every rename until released.
#[derive(Debug)]
struct GatedRenames {
    inner: Arc<MemoryStore>,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl WorkspaceStore for GatedRenames {
    async fn create_with_owner(&self, workspace: &Workspace, owner: &Membership) -> AppResult<()> {
        self.inner.create_with_owner(workspace, owner).await
    }

    async fn find_by_id(&self, id: WorkspaceId) -> AppResult<Option<Workspace>> {
        WorkspaceStore::find_by_id(self.inner.as_ref(), id).await
    }

    async fn rename(
        &self,
        id: WorkspaceId,
        name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Workspace>> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.rename(id, name, now).await
    }

    async fn archive(&self, id: WorkspaceId, now: DateTime<Utc>) -> AppResult<Option<Workspace>> {
        self.inner.archive(id, now).await
    }
}

#[tokio::test]
async fn test_rename_racing_delete_keeps_workspace_deleted() {
    let memory = Arc::new(MemoryStore::new());
    let gated = Arc::new(GatedRenames {
        inner: memory.clone(),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let store = Store::new(
        memory.clone(),
        memory.clone(),
        gated.clone(),
        memory.clone(),
        memory.clone(),
        StdDuration::from_secs(5),
    );
    let app = TestApp::with_store(test_config(), store);
    let (owner, workspace) = app.create_workspace("owner@x.com", "Acme").await;

    let orchestrator = app.orchestrator.clone();
    let rename = tokio::spawn(async move {
        orchestrator
            .rename_workspace(workspace, "Acme Renamed", owner)
            .await
    });

    // The rename has passed its permission check and is parked at the write.
    gated.entered.notified().await;
    app.orchestrator
        .delete_workspace(workspace, owner)
        .await
        .unwrap();
    gated.release.notify_one();

    let err = rename.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let stored = WorkspaceStore::find_by_id(memory.as_ref(), workspace)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_active());
    assert!(stored.deleted_at.is_some());
    assert_eq!(stored.name, "Acme");
    assert!(
        !app.orchestrator
            .check_permission(workspace, owner, Capability::ReadContent)
            .await
            .unwrap()
    );
}
