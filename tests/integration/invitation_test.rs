//! Integration tests for the invitation lifecycle.

mod helpers;

use chrono::Duration;

use helpers::TestApp;
use keyward_core::error::ErrorKind;
use keyward_core::events::WorkspaceEvent;
use keyward_core::types::{AccountId, WorkspaceId};
use keyward_entity::membership::MemberRole;

async fn workspace_with_admin(app: &TestApp) -> (WorkspaceId, AccountId, AccountId) {
    let (owner, workspace) = app.create_workspace("owner@x.com", "Acme").await;
    let admin = app.create_user("admin@x.com").await;
    app.orchestrator
        .add_member(workspace, admin, MemberRole::Admin, owner)
        .await
        .unwrap();
    (workspace, owner, admin)
}

#[tokio::test]
async fn test_invite_and_accept() {
    let app = TestApp::new();
    let (workspace, owner, _) = workspace_with_admin(&app).await;

    let invitation = app
        .orchestrator
        .invite_member(workspace, "bob@x.com", MemberRole::Member, owner)
        .await
        .unwrap();
    assert_eq!(invitation.expires_at, app.clock_now() + Duration::days(7));

    let bob = app.create_user("bob@x.com").await;
    app.orchestrator
        .accept_invitation(&invitation.token, bob)
        .await
        .unwrap();

    let role = app
        .orchestrator
        .memberships()
        .role_in(workspace, bob)
        .await
        .unwrap();
    assert_eq!(role, Some(MemberRole::Member));

    let err = app
        .orchestrator
        .accept_invitation(&invitation.token, bob)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let members = app.orchestrator.list_members(workspace, owner).await.unwrap();
    assert_eq!(members.iter().filter(|m| m.user_id == bob).count(), 1);
    assert!(
        app.events
            .workspace()
            .iter()
            .any(|e| matches!(e, WorkspaceEvent::InvitationAccepted { .. }))
    );
}

#[tokio::test]
async fn test_members_and_guests_cannot_invite() {
    let app = TestApp::new();
    let (workspace, owner, _) = workspace_with_admin(&app).await;
    let member = app.create_user("member@x.com").await;
    let guest = app.create_user("guest@x.com").await;
    app.orchestrator
        .add_member(workspace, member, MemberRole::Member, owner)
        .await
        .unwrap();
    app.orchestrator
        .add_member(workspace, guest, MemberRole::Guest, owner)
        .await
        .unwrap();

    for actor in [member, guest] {
        let err = app
            .orchestrator
            .invite_member(workspace, "bob@x.com", MemberRole::Guest, actor)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }
}

#[tokio::test]
async fn test_admin_cannot_invite_owner() {
    let app = TestApp::new();
    let (workspace, _, admin) = workspace_with_admin(&app).await;

    let err = app
        .orchestrator
        .invite_member(workspace, "bob@x.com", MemberRole::Owner, admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    assert!(
        app.orchestrator
            .invite_member(workspace, "bob@x.com", MemberRole::Admin, admin)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_one_pending_invitation_per_email() {
    let app = TestApp::new();
    let (workspace, owner, admin) = workspace_with_admin(&app).await;

    app.orchestrator
        .invite_member(workspace, "bob@x.com", MemberRole::Member, owner)
        .await
        .unwrap();
    let err = app
        .orchestrator
        .invite_member(workspace, " BOB@x.com", MemberRole::Guest, admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    // Once the first one lapses a new invitation may be issued.
    app.advance(Duration::days(8));
    assert!(
        app.orchestrator
            .invite_member(workspace, "bob@x.com", MemberRole::Member, owner)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_inviting_an_existing_member_conflicts() {
    let app = TestApp::new();
    let (workspace, owner, _) = workspace_with_admin(&app).await;

    let err = app
        .orchestrator
        .invite_member(workspace, "admin@x.com", MemberRole::Member, owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_expired_invitation_is_rejected() {
    let app = TestApp::new();
    let (workspace, owner, _) = workspace_with_admin(&app).await;
    let invitation = app
        .orchestrator
        .invite_member(workspace, "bob@x.com", MemberRole::Member, owner)
        .await
        .unwrap();
    let bob = app.create_user("bob@x.com").await;

    app.advance(Duration::days(7));
    for _ in 0..2 {
        let err = app
            .orchestrator
            .accept_invitation(&invitation.token, bob)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
    assert!(
        app.orchestrator
            .memberships()
            .role_in(workspace, bob)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_email_mismatch_is_forbidden() {
    let app = TestApp::new();
    let (workspace, owner, _) = workspace_with_admin(&app).await;
    let invitation = app
        .orchestrator
        .invite_member(workspace, "bob@x.com", MemberRole::Member, owner)
        .await
        .unwrap();

    let mallory = app.create_user("mallory@x.com").await;
    let err = app
        .orchestrator
        .accept_invitation(&invitation.token, mallory)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    // The invitation is still usable by its addressee.
    let bob = app.create_user("BOB@x.com").await;
    assert!(
        app.orchestrator
            .accept_invitation(&invitation.token, bob)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_accept_when_already_member_conflicts() {
    let app = TestApp::new();
    let (workspace, owner, _) = workspace_with_admin(&app).await;
    let invitation = app
        .orchestrator
        .invite_member(workspace, "bob@x.com", MemberRole::Member, owner)
        .await
        .unwrap();
    let bob = app.create_user("bob@x.com").await;
    app.orchestrator
        .add_member(workspace, bob, MemberRole::Guest, owner)
        .await
        .unwrap();

    let err = app
        .orchestrator
        .accept_invitation(&invitation.token, bob)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let role = app
        .orchestrator
        .memberships()
        .role_in(workspace, bob)
        .await
        .unwrap();
    assert_eq!(role, Some(MemberRole::Guest));
}

#[tokio::test]
async fn test_unknown_token_is_not_found() {
    let app = TestApp::new();
    let bob = app.create_user("bob@x.com").await;
    let err = app
        .orchestrator
        .accept_invitation("no-such-token", bob)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_cancel_is_terminal() {
    let app = TestApp::new();
    let (workspace, owner, admin) = workspace_with_admin(&app).await;
    let member = app.create_user("member@x.com").await;
    app.orchestrator
        .add_member(workspace, member, MemberRole::Member, owner)
        .await
        .unwrap();
    let invitation = app
        .orchestrator
        .invite_member(workspace, "bob@x.com", MemberRole::Member, owner)
        .await
        .unwrap();

    let err = app
        .orchestrator
        .cancel_invitation(invitation.invitation_id, member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    app.orchestrator
        .cancel_invitation(invitation.invitation_id, admin)
        .await
        .unwrap();

    let err = app
        .orchestrator
        .cancel_invitation(invitation.invitation_id, admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let bob = app.create_user("bob@x.com").await;
    let err = app
        .orchestrator
        .accept_invitation(&invitation.token, bob)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_list_pending_and_purge() {
    let app = TestApp::new();
    let (workspace, owner, admin) = workspace_with_admin(&app).await;

    app.orchestrator
        .invite_member(workspace, "early@x.com", MemberRole::Member, owner)
        .await
        .unwrap();
    app.advance(Duration::days(4));
    app.orchestrator
        .invite_member(workspace, "late@x.com", MemberRole::Guest, admin)
        .await
        .unwrap();

    let pending = app
        .orchestrator
        .list_pending_invitations(workspace, admin)
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);

    app.advance(Duration::days(4));
    let pending = app
        .orchestrator
        .list_pending_invitations(workspace, admin)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].email, "late@x.com");

    assert_eq!(app.orchestrator.purge_expired_invitations().await.unwrap(), 1);
    assert_eq!(app.orchestrator.purge_expired_invitations().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invitation_to_deleted_workspace_cannot_be_accepted() {
    let app = TestApp::new();
    let (workspace, owner, _) = workspace_with_admin(&app).await;
    let invitation = app
        .orchestrator
        .invite_member(workspace, "bob@x.com", MemberRole::Member, owner)
        .await
        .unwrap();
    app.orchestrator
        .delete_workspace(workspace, owner)
        .await
        .unwrap();

    let bob = app.create_user("bob@x.com").await;
    let err = app
        .orchestrator
        .accept_invitation(&invitation.token, bob)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_create_one_membership() {
    let app = TestApp::new();
    let (workspace, owner, _) = workspace_with_admin(&app).await;
    let invitation = app
        .orchestrator
        .invite_member(workspace, "bob@x.com", MemberRole::Member, owner)
        .await
        .unwrap();
    let bob = app.create_user("bob@x.com").await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let orchestrator = app.orchestrator.clone();
        let token = invitation.token.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.accept_invitation(&token, bob).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e.kind, ErrorKind::Conflict),
        }
    }
    assert_eq!(accepted, 1);

    let members = app.orchestrator.list_members(workspace, owner).await.unwrap();
    assert_eq!(members.iter().filter(|m| m.user_id == bob).count(), 1);
}
