//! Boundary validation: turns loosely-typed request bodies into typed records,
//! and re-checks the structural shape of a record before it is persisted.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::{
    domain::{Event, EventId, OrganizationId, Participant, UserId},
    error::{ApiError, FieldIssue},
    protocol::{EventDraft, EventEdit},
};

const DATE_FORMAT: &str = "%Y-%m-%d";

impl EventDraft {
    /// Builds a typed event owned by `organizer_id` / `organization_id`.
    pub fn into_event(
        self,
        id: EventId,
        organizer_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Event, ApiError> {
        let mut issues = Vec::new();

        let title = required_text("title", self.title, &mut issues);
        let description = required_text("description", self.description, &mut issues);
        let date = match self.date {
            Some(raw) => parse_date("date", &raw).map_err(|issue| issues.push(issue)).ok(),
            None => {
                issues.push(FieldIssue::new("date", "is required"));
                None
            }
        };
        if self.is_public.is_none() {
            issues.push(FieldIssue::new("isPublic", "is required"));
        }
        if self.registration_options.is_none() {
            issues.push(FieldIssue::new("registrationOptions", "is required"));
        }

        let (Some(title), Some(description), Some(date), Some(is_public), Some(options)) = (
            title,
            description,
            date,
            self.is_public,
            self.registration_options,
        ) else {
            return Err(ApiError::validation(issues));
        };

        let event = Event {
            id,
            title,
            date,
            description,
            location: self.location,
            is_public,
            organizer_id,
            organization_id,
            max_participants: self.max_participants,
            registration_options: options,
            participants: self.participants.unwrap_or_default(),
        };
        validate_event(&event)?;
        Ok(event)
    }
}

impl EventEdit {
    /// Applies the edit to `event`. Ownership fields and participants are
    /// never touched. On error `event` is left unchanged.
    pub fn apply_to(self, event: &mut Event) -> Result<(), ApiError> {
        let mut issues = Vec::new();

        let title = required_text("title", self.title, &mut issues);
        let description = required_text("description", self.description, &mut issues);
        let date = match self.date {
            Some(raw) => parse_date("date", &raw).map_err(|issue| issues.push(issue)).ok(),
            None => {
                issues.push(FieldIssue::new("date", "is required"));
                None
            }
        };
        if self.is_public.is_none() {
            issues.push(FieldIssue::new("isPublic", "is required"));
        }

        let (Some(title), Some(description), Some(date), Some(is_public)) =
            (title, description, date, self.is_public)
        else {
            return Err(ApiError::validation(issues));
        };

        let mut edited = event.clone();
        edited.title = title;
        edited.description = description;
        edited.date = date;
        edited.is_public = is_public;
        if let Some(location) = self.location {
            edited.location = Some(location);
        }
        if let Some(max) = self.max_participants {
            edited.max_participants = Some(max);
        }
        if let Some(options) = self.registration_options {
            edited.registration_options = options;
        }

        validate_event(&edited)?;
        *event = edited;
        Ok(())
    }
}

/// Full structural check of an event as it would be persisted.
pub fn validate_event(event: &Event) -> Result<(), ApiError> {
    let mut issues = Vec::new();
    if event.title.trim().is_empty() {
        issues.push(FieldIssue::new("title", "must not be empty"));
    }
    if event.description.trim().is_empty() {
        issues.push(FieldIssue::new("description", "must not be empty"));
    }
    issues.extend(participant_issues(
        &event.participants,
        event.max_participants,
    ));

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(issues))
    }
}

/// Issues with a participant list: blank names, duplicate ids, and a list
/// longer than the capacity bound.
pub fn participant_issues(participants: &[Participant], max: Option<u32>) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::with_capacity(participants.len());

    for (index, participant) in participants.iter().enumerate() {
        if participant.first_name.trim().is_empty() {
            issues.push(FieldIssue::new(
                format!("participants[{index}].firstName"),
                "must not be empty",
            ));
        }
        if participant.last_name.trim().is_empty() {
            issues.push(FieldIssue::new(
                format!("participants[{index}].lastName"),
                "must not be empty",
            ));
        }
        if !seen.insert(participant.id) {
            issues.push(FieldIssue::new(
                format!("participants[{index}].id"),
                format!("duplicate participant {}", participant.id),
            ));
        }
    }

    if let Some(max) = max {
        if participants.len() > max as usize {
            issues.push(FieldIssue::new(
                "participants",
                format!("{} participants exceed the maximum of {max}", participants.len()),
            ));
        }
    }

    issues
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, FieldIssue> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| FieldIssue::new(field, format!("'{raw}' is not a YYYY-MM-DD date")))
}

fn required_text(
    field: &str,
    value: Option<String>,
    issues: &mut Vec<FieldIssue>,
) -> Option<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Some(text),
        Some(_) => {
            issues.push(FieldIssue::new(field, "must not be empty"));
            None
        }
        None => {
            issues.push(FieldIssue::new(field, "is required"));
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
