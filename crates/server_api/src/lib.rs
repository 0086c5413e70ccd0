//! Event access control: who sees which projection of an event, and how
//! participants move through registration.
//!
//! Every operation takes the caller identity plus plain parameters and
//! returns `Result<_, ApiError>`; mapping errors onto a transport is the
//! caller's job.

use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::{CallerIdentity, Event, EventId, Participant, UserId},
    error::{ApiError, ErrorCode},
    protocol::{EventDraft, EventEdit, EventView, ParticipationStatus},
    validation::validate_event,
};
use storage::{EventStore, OrganizationDirectory, UserDirectory};
use tokio::sync::Mutex;

pub mod registration;
pub mod visibility;

pub use visibility::project;

#[derive(Clone)]
pub struct ApiContext {
    pub events: Arc<dyn EventStore>,
    pub users: Arc<dyn UserDirectory>,
    pub organizations: Arc<dyn OrganizationDirectory>,
    /// Held across every read-modify-write of the event collection.
    write_gate: Arc<Mutex<()>>,
}

impl ApiContext {
    pub fn new<S>(storage: S) -> Self
    where
        S: EventStore + UserDirectory + OrganizationDirectory + 'static,
    {
        let storage = Arc::new(storage);
        Self {
            events: storage.clone(),
            users: storage.clone(),
            organizations: storage,
            write_gate: Arc::new(Mutex::new(())),
        }
    }
}

pub async fn list_events(
    ctx: &ApiContext,
    caller: CallerIdentity,
) -> Result<Vec<EventView>, ApiError> {
    let events = ctx.events.load_all().await.map_err(unavailable)?;
    Ok(events.iter().map(|event| project(event, caller)).collect())
}

/// Returns the stored event without projection.
pub async fn get_event(ctx: &ApiContext, event_id: EventId) -> Result<Event, ApiError> {
    ctx.events
        .load_by_id(event_id)
        .await
        .map_err(unavailable)?
        .ok_or_else(event_not_found)
}

pub async fn create_event(
    ctx: &ApiContext,
    user_id: UserId,
    draft: EventDraft,
) -> Result<Event, ApiError> {
    let organization = ctx
        .organizations
        .find_by_owner(user_id)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| {
            ApiError::new(
                ErrorCode::Forbidden,
                "user does not have an organization",
            )
        })?;

    let event = draft.into_event(EventId::new(), user_id, organization.id)?;
    with_events(ctx, |events| {
        events.push(event.clone());
        Ok(event)
    })
    .await
}

pub async fn edit_event(
    ctx: &ApiContext,
    user_id: UserId,
    event_id: EventId,
    edit: EventEdit,
) -> Result<Event, ApiError> {
    with_events(ctx, |events| {
        let event = owned_event_mut(events, event_id, user_id)?;
        edit.apply_to(event)?;
        Ok(event.clone())
    })
    .await
}

/// Replaces the participant list wholesale.
pub async fn edit_participants(
    ctx: &ApiContext,
    user_id: UserId,
    event_id: EventId,
    participants: Vec<Participant>,
) -> Result<Event, ApiError> {
    with_events(ctx, |events| {
        let event = owned_event_mut(events, event_id, user_id)?;
        let edited = Event {
            participants,
            ..event.clone()
        };
        validate_event(&edited)?;
        *event = edited;
        Ok(event.clone())
    })
    .await
}

pub async fn delete_event(
    ctx: &ApiContext,
    user_id: UserId,
    event_id: EventId,
) -> Result<(), ApiError> {
    with_events(ctx, |events| {
        let index = events
            .iter()
            .position(|e| e.id == event_id && e.is_organized_by(user_id))
            .ok_or_else(event_not_found)?;
        events.remove(index);
        Ok(())
    })
    .await
}

pub async fn request_participation(
    ctx: &ApiContext,
    user_id: UserId,
    event_id: EventId,
) -> Result<Event, ApiError> {
    let profile = ctx
        .users
        .find_user(user_id)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| ApiError::not_found("user profile not found"))?;

    with_events(ctx, |events| {
        let event = event_mut(events, event_id)?;
        registration::request(event, &profile, Utc::now())?;
        validate_event(event)?;
        Ok(event.clone())
    })
    .await
}

pub async fn cancel_registration(
    ctx: &ApiContext,
    user_id: UserId,
    event_id: EventId,
) -> Result<Participant, ApiError> {
    with_events(ctx, |events| {
        registration::cancel(event_mut(events, event_id)?, user_id)
    })
    .await
}

pub async fn approve_participant(
    ctx: &ApiContext,
    user_id: UserId,
    event_id: EventId,
    participant_id: UserId,
) -> Result<Participant, ApiError> {
    with_events(ctx, |events| {
        registration::approve(event_mut(events, event_id)?, user_id, participant_id).cloned()
    })
    .await
}

pub async fn record_payment(
    ctx: &ApiContext,
    user_id: UserId,
    event_id: EventId,
    participant_id: UserId,
) -> Result<Participant, ApiError> {
    with_events(ctx, |events| {
        registration::record_payment(event_mut(events, event_id)?, user_id, participant_id)
            .cloned()
    })
    .await
}

pub async fn remove_participant(
    ctx: &ApiContext,
    user_id: UserId,
    event_id: EventId,
    participant_id: UserId,
) -> Result<Participant, ApiError> {
    with_events(ctx, |events| {
        registration::remove(event_mut(events, event_id)?, user_id, participant_id)
    })
    .await
}

pub async fn participation_status(
    ctx: &ApiContext,
    user_id: UserId,
    event_id: EventId,
) -> Result<ParticipationStatus, ApiError> {
    let event = get_event(ctx, event_id).await?;
    Ok(ParticipationStatus {
        event_id,
        state: registration::state_of(&event, user_id),
        participant: event.participant(user_id).cloned(),
    })
}

/// Runs `mutate` over the whole collection under the write gate and saves the
/// result. An error from `mutate` skips the save, leaving the store untouched.
async fn with_events<T>(
    ctx: &ApiContext,
    mutate: impl FnOnce(&mut Vec<Event>) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let _guard = ctx.write_gate.lock().await;
    let mut events = ctx.events.load_all().await.map_err(unavailable)?;
    let output = mutate(&mut events)?;
    ctx.events.save_all(&events).await.map_err(unavailable)?;
    Ok(output)
}

fn event_mut(events: &mut [Event], event_id: EventId) -> Result<&mut Event, ApiError> {
    events
        .iter_mut()
        .find(|e| e.id == event_id)
        .ok_or_else(event_not_found)
}

/// A wrong owner and a missing event are indistinguishable to the caller.
fn owned_event_mut(
    events: &mut [Event],
    event_id: EventId,
    user_id: UserId,
) -> Result<&mut Event, ApiError> {
    events
        .iter_mut()
        .find(|e| e.id == event_id && e.is_organized_by(user_id))
        .ok_or_else(event_not_found)
}

fn event_not_found() -> ApiError {
    ApiError::not_found("event not found")
}

fn unavailable(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::StoreUnavailable, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
