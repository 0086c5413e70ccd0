//! Participant registration transitions.
//!
//! A user is either not registered, or present in the participant list. A
//! present participant is pending until approved when the event requires
//! approval; otherwise registration alone admits them. There is no rejected
//! state: the organizer removes the participant instead.

use chrono::{DateTime, Utc};
use shared::{
    domain::{Event, Participant, ParticipationState, UserId, UserProfile},
    error::{ApiError, ErrorCode},
};

pub fn state_of(event: &Event, user_id: UserId) -> ParticipationState {
    match event.participant(user_id) {
        None => ParticipationState::NotRegistered,
        Some(participant) if participant.is_approved => ParticipationState::Approved,
        Some(_) if event.registration_options.approval_required() => ParticipationState::Pending,
        Some(_) => ParticipationState::Registered,
    }
}

/// Appends `profile` to the end of the participant list.
pub fn request<'a>(
    event: &'a mut Event,
    profile: &UserProfile,
    now: DateTime<Utc>,
) -> Result<&'a Participant, ApiError> {
    if event.participant(profile.id).is_some() {
        return Err(ApiError::new(
            ErrorCode::Conflict,
            "user is already registered for this event",
        ));
    }
    if event.is_full() {
        return Err(ApiError::new(
            ErrorCode::CapacityExceeded,
            "event has reached its maximum number of participants",
        ));
    }

    let index = event.participants.len();
    event.participants.push(Participant::register(profile, now));
    Ok(&event.participants[index])
}

/// Removes the first entry for `subject`; the rest keep their order.
pub fn cancel(event: &mut Event, subject: UserId) -> Result<Participant, ApiError> {
    let index = event
        .participants
        .iter()
        .position(|p| p.id == subject)
        .ok_or_else(|| ApiError::not_found("user not registered for this event"))?;
    Ok(event.participants.remove(index))
}

pub fn approve(
    event: &mut Event,
    caller: UserId,
    participant_id: UserId,
) -> Result<&Participant, ApiError> {
    let participant = organizer_target(event, caller, participant_id)?;
    participant.is_approved = true;
    Ok(participant)
}

pub fn record_payment(
    event: &mut Event,
    caller: UserId,
    participant_id: UserId,
) -> Result<&Participant, ApiError> {
    let participant = organizer_target(event, caller, participant_id)?;
    participant.has_paid = true;
    Ok(participant)
}

/// Organizer-initiated removal.
pub fn remove(
    event: &mut Event,
    caller: UserId,
    participant_id: UserId,
) -> Result<Participant, ApiError> {
    ensure_organizer(event, caller)?;
    cancel(event, participant_id)
}

/// Non-organizers get `NotFound` so they cannot probe for events they do not own.
pub fn ensure_organizer(event: &Event, caller: UserId) -> Result<(), ApiError> {
    if event.is_organized_by(caller) {
        Ok(())
    } else {
        Err(ApiError::not_found("event not found"))
    }
}

fn organizer_target(
    event: &mut Event,
    caller: UserId,
    participant_id: UserId,
) -> Result<&mut Participant, ApiError> {
    ensure_organizer(event, caller)?;
    event
        .participant_mut(participant_id)
        .ok_or_else(|| ApiError::not_found("user not registered for this event"))
}

#[cfg(test)]
#[path = "tests/registration_tests.rs"]
mod tests;
