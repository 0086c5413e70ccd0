use serde::{Deserialize, Serialize};

use crate::domain::{
    Event, EventId, Location, Participant, ParticipationState, RegistrationOptions,
};

/// Body of an event creation request. Every field is optional on the wire so
/// that validation can report each missing or malformed field by name.
/// Client-supplied `id`, `organizerId` and `organizationId` are not part of
/// the draft and are dropped during deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub registration_options: Option<RegistrationOptions>,
    #[serde(default)]
    pub participants: Option<Vec<Participant>>,
}

/// Body of an organizer edit. `location`, `maxParticipants` and
/// `registrationOptions` keep their stored value when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub registration_options: Option<RegistrationOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            location: event.location.clone(),
        }
    }
}

/// The projection of an event a caller is allowed to see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventView {
    Full(Event),
    Summary(EventSummary),
}

impl EventView {
    pub fn id(&self) -> EventId {
        match self {
            Self::Full(event) => event.id,
            Self::Summary(summary) => summary.id,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationStatus {
    pub event_id: EventId,
    pub state: ParticipationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<Participant>,
}
