use super::*;
use async_trait::async_trait;
use shared::domain::{
    Organization, OrganizationId, ParticipationState, RegistrationOptions, UserProfile,
};
use storage::MemoryStorage;

struct Fixture {
    ctx: ApiContext,
    storage: MemoryStorage,
    organizer: UserId,
}

async fn setup() -> Fixture {
    let storage = MemoryStorage::new();
    let organizer = add_user(&storage, "olivia").await;
    storage
        .insert_organization(Organization {
            id: OrganizationId::new(),
            name: "Chess club".into(),
            user_id: organizer,
        })
        .await;
    Fixture {
        ctx: ApiContext::new(storage.clone()),
        storage,
        organizer,
    }
}

async fn add_user(storage: &MemoryStorage, username: &str) -> UserId {
    let id = UserId::new();
    storage
        .insert_user(UserProfile {
            id,
            username: username.into(),
            first_name: username.into(),
            last_name: "Member".into(),
        })
        .await;
    id
}

fn draft(is_public: bool, registration: bool, approval: bool) -> EventDraft {
    EventDraft {
        title: Some("Blitz tournament".into()),
        date: Some("2025-10-04".into()),
        description: Some("Five-minute games".into()),
        is_public: Some(is_public),
        registration_options: Some(RegistrationOptions {
            is_registration_required: Some(registration),
            requires_approval: Some(approval),
            ..RegistrationOptions::default()
        }),
        ..EventDraft::default()
    }
}

fn edit(title: &str, is_public: bool) -> EventEdit {
    EventEdit {
        title: Some(title.into()),
        date: Some("2025-10-05".into()),
        description: Some("Moved a day".into()),
        is_public: Some(is_public),
        ..EventEdit::default()
    }
}

#[tokio::test]
async fn create_assigns_ownership_from_caller() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(true, false, false))
        .await
        .expect("create");

    assert_eq!(event.organizer_id, fx.organizer);
    let stored = get_event(&fx.ctx, event.id).await.expect("get");
    assert_eq!(stored, event);
}

#[tokio::test]
async fn create_without_organization_is_forbidden() {
    let fx = setup().await;
    let stranger = add_user(&fx.storage, "sam").await;

    let err = create_event(&fx.ctx, stranger, draft(true, false, false))
        .await
        .expect_err("no organization");
    assert_eq!(err.code, ErrorCode::Forbidden);
    assert!(fx.storage.load_all().await.expect("load").is_empty());
}

#[tokio::test]
async fn invalid_draft_is_not_persisted() {
    let fx = setup().await;
    let mut bad = draft(true, false, false);
    bad.title = Some(String::new());

    let err = create_event(&fx.ctx, fx.organizer, bad)
        .await
        .expect_err("blank title");
    assert_eq!(err.code, ErrorCode::ValidationFailed);
    assert_eq!(err.issues[0].field, "title");
    assert!(fx.storage.load_all().await.expect("load").is_empty());
}

#[tokio::test]
async fn list_projects_each_event_for_the_caller() {
    let fx = setup().await;
    let open = create_event(&fx.ctx, fx.organizer, draft(true, false, false))
        .await
        .expect("open");
    let private = create_event(&fx.ctx, fx.organizer, draft(false, true, true))
        .await
        .expect("private");

    let anonymous = list_events(&fx.ctx, CallerIdentity::Anonymous)
        .await
        .expect("list");
    assert_eq!(anonymous.len(), 2);
    assert_eq!(anonymous[0].id(), open.id);
    assert!(anonymous[0].is_full());
    assert_eq!(anonymous[1].id(), private.id);
    assert!(!anonymous[1].is_full());

    let organizer = list_events(&fx.ctx, fx.organizer.into())
        .await
        .expect("list");
    assert!(organizer.iter().all(EventView::is_full));
}

#[tokio::test]
async fn approval_reveals_private_event_to_participant() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(false, true, true))
        .await
        .expect("create");
    let member = add_user(&fx.storage, "pia").await;
    request_participation(&fx.ctx, member, event.id)
        .await
        .expect("request");

    let before = list_events(&fx.ctx, member.into()).await.expect("list");
    assert!(!before[0].is_full());

    approve_participant(&fx.ctx, fx.organizer, event.id, member)
        .await
        .expect("approve");
    let after = list_events(&fx.ctx, member.into()).await.expect("list");
    assert!(after[0].is_full());
}

#[tokio::test]
async fn duplicate_request_conflicts_and_cancel_round_trips() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(true, true, false))
        .await
        .expect("create");
    let member = add_user(&fx.storage, "max").await;

    request_participation(&fx.ctx, member, event.id)
        .await
        .expect("first");
    let err = request_participation(&fx.ctx, member, event.id)
        .await
        .expect_err("second");
    assert_eq!(err.code, ErrorCode::Conflict);

    cancel_registration(&fx.ctx, member, event.id)
        .await
        .expect("cancel");
    let again = request_participation(&fx.ctx, member, event.id)
        .await
        .expect("again");
    assert_eq!(again.participants.len(), 1);
    assert_eq!(again.participants[0].id, member);
}

#[tokio::test]
async fn request_for_unknown_event_or_profile_is_not_found() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(true, false, false))
        .await
        .expect("create");

    let err = request_participation(&fx.ctx, fx.organizer, EventId::new())
        .await
        .expect_err("unknown event");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = request_participation(&fx.ctx, UserId::new(), event.id)
        .await
        .expect_err("unknown profile");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn full_event_rejects_request() {
    let fx = setup().await;
    let mut capped = draft(true, true, false);
    capped.max_participants = Some(1);
    let event = create_event(&fx.ctx, fx.organizer, capped)
        .await
        .expect("create");
    let first = add_user(&fx.storage, "ana").await;
    let second = add_user(&fx.storage, "bo").await;

    request_participation(&fx.ctx, first, event.id)
        .await
        .expect("first");
    let err = request_participation(&fx.ctx, second, event.id)
        .await
        .expect_err("second");
    assert_eq!(err.code, ErrorCode::CapacityExceeded);
}

#[tokio::test]
async fn cancel_distinguishes_unknown_event_from_missing_registration() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(true, false, false))
        .await
        .expect("create");
    let member = add_user(&fx.storage, "ida").await;

    let unknown = cancel_registration(&fx.ctx, member, EventId::new())
        .await
        .expect_err("unknown event");
    let missing = cancel_registration(&fx.ctx, member, event.id)
        .await
        .expect_err("not registered");

    assert_eq!(unknown.code, ErrorCode::NotFound);
    assert_eq!(missing.code, ErrorCode::NotFound);
    assert_ne!(unknown.message, missing.message);
}

#[tokio::test]
async fn non_organizer_cannot_edit_or_delete() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(true, false, false))
        .await
        .expect("create");
    let other = add_user(&fx.storage, "eve").await;

    let err = edit_event(&fx.ctx, other, event.id, edit("Hijacked", true))
        .await
        .expect_err("edit");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = delete_event(&fx.ctx, other, event.id)
        .await
        .expect_err("delete");
    assert_eq!(err.code, ErrorCode::NotFound);

    assert_eq!(
        get_event(&fx.ctx, event.id).await.expect("get").title,
        event.title
    );
}

#[tokio::test]
async fn organizer_edit_keeps_participants() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(true, true, false))
        .await
        .expect("create");
    let member = add_user(&fx.storage, "liv").await;
    request_participation(&fx.ctx, member, event.id)
        .await
        .expect("request");

    let edited = edit_event(&fx.ctx, fx.organizer, event.id, edit("Rapid", false))
        .await
        .expect("edit");
    assert_eq!(edited.title, "Rapid");
    assert!(!edited.is_public);
    assert_eq!(edited.participants.len(), 1);
    assert_eq!(edited.organizer_id, fx.organizer);
}

#[tokio::test]
async fn delete_succeeds_once() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(true, false, false))
        .await
        .expect("create");

    delete_event(&fx.ctx, fx.organizer, event.id)
        .await
        .expect("delete");
    let err = delete_event(&fx.ctx, fx.organizer, event.id)
        .await
        .expect_err("second delete");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn edit_participants_rejects_duplicates_without_saving() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(true, true, false))
        .await
        .expect("create");
    let member = add_user(&fx.storage, "kit").await;
    let joined = request_participation(&fx.ctx, member, event.id)
        .await
        .expect("request");
    let participant = joined.participants[0].clone();

    let err = edit_participants(
        &fx.ctx,
        fx.organizer,
        event.id,
        vec![participant.clone(), participant.clone()],
    )
    .await
    .expect_err("duplicate");
    assert_eq!(err.code, ErrorCode::ValidationFailed);
    assert_eq!(err.issues.len(), 1);
    assert_eq!(
        get_event(&fx.ctx, event.id).await.expect("get").participants,
        vec![participant.clone()]
    );

    let replaced = edit_participants(&fx.ctx, fx.organizer, event.id, Vec::new())
        .await
        .expect("clear");
    assert!(replaced.participants.is_empty());
    assert!(get_event(&fx.ctx, event.id)
        .await
        .expect("get")
        .participants
        .is_empty());
}

#[tokio::test]
async fn payment_and_status_reflect_organizer_actions() {
    let fx = setup().await;
    let event = create_event(&fx.ctx, fx.organizer, draft(false, true, true))
        .await
        .expect("create");
    let member = add_user(&fx.storage, "ray").await;

    let status = participation_status(&fx.ctx, member, event.id)
        .await
        .expect("status");
    assert_eq!(status.state, ParticipationState::NotRegistered);

    request_participation(&fx.ctx, member, event.id)
        .await
        .expect("request");
    let paid = record_payment(&fx.ctx, fx.organizer, event.id, member)
        .await
        .expect("payment");
    assert!(paid.has_paid);

    let status = participation_status(&fx.ctx, member, event.id)
        .await
        .expect("status");
    assert_eq!(status.state, ParticipationState::Pending);
    assert!(status.participant.expect("participant").has_paid);

    remove_participant(&fx.ctx, fx.organizer, event.id, member)
        .await
        .expect("remove");
    let status = participation_status(&fx.ctx, member, event.id)
        .await
        .expect("status");
    assert_eq!(status.state, ParticipationState::NotRegistered);
}

struct UnreachableStore;

#[async_trait]
impl EventStore for UnreachableStore {
    async fn load_all(&self) -> anyhow::Result<Vec<Event>> {
        anyhow::bail!("disk unplugged")
    }

    async fn save_all(&self, _events: &[Event]) -> anyhow::Result<()> {
        anyhow::bail!("disk unplugged")
    }
}

#[async_trait]
impl UserDirectory for UnreachableStore {
    async fn find_user(&self, _user_id: UserId) -> anyhow::Result<Option<UserProfile>> {
        anyhow::bail!("disk unplugged")
    }
}

#[async_trait]
impl OrganizationDirectory for UnreachableStore {
    async fn find_by_owner(&self, _owner: UserId) -> anyhow::Result<Option<Organization>> {
        anyhow::bail!("disk unplugged")
    }
}

#[tokio::test]
async fn store_failures_surface_as_store_unavailable() {
    let ctx = ApiContext::new(UnreachableStore);

    let err = list_events(&ctx, CallerIdentity::Anonymous)
        .await
        .expect_err("list");
    assert_eq!(err.code, ErrorCode::StoreUnavailable);

    let err = delete_event(&ctx, UserId::new(), EventId::new())
        .await
        .expect_err("delete");
    assert_eq!(err.code, ErrorCode::StoreUnavailable);
}
