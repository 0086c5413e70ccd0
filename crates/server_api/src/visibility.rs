use shared::{
    domain::{CallerIdentity, Event},
    protocol::{EventSummary, EventView},
};

pub fn project(event: &Event, caller: CallerIdentity) -> EventView {
    if can_view_full(event, caller) {
        EventView::Full(event.clone())
    } else {
        EventView::Summary(EventSummary::from(event))
    }
}

/// First matching rule wins; anything unmatched sees the summary.
pub fn can_view_full(event: &Event, caller: CallerIdentity) -> bool {
    let options = &event.registration_options;
    match caller {
        CallerIdentity::Subject(user_id) if event.is_organized_by(user_id) => true,
        CallerIdentity::Anonymous
            if options.registration_required()
                || options.approval_required()
                || !event.is_public =>
        {
            false
        }
        CallerIdentity::Subject(user_id) if !event.is_public => {
            match event.participant(user_id) {
                Some(participant) if options.registration_required() => {
                    // An unset approval flag admits nobody, approved or not.
                    match options.requires_approval {
                        Some(true) => participant.is_approved,
                        Some(false) => true,
                        None => false,
                    }
                }
                _ => false,
            }
        }
        _ if event.is_public => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/visibility_tests.rs"]
mod tests;
