//! Role-based access rules.
//!
//! Every protected operation is listed once in [`POLICY`] together with the
//! roles allowed to perform it. Handlers name the [`Action`] they are about
//! to perform and never compare role names themselves.

use crate::models::Role;
use Role::{Admin, Attendee, Organizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    BookTicket,
    ViewOwnTickets,
    CancelTicket,
    ViewOrganizerTickets,
    ViewAllTickets,
    SubmitReview,
    ViewAdminDashboard,
    ViewOrganizerDashboard,
}

pub const POLICY: &[(Action, &[Role])] = &[
    (Action::CreateEvent, &[Organizer, Admin]),
    (Action::UpdateEvent, &[Organizer, Admin]),
    (Action::DeleteEvent, &[Organizer, Admin]),
    (Action::BookTicket, &[Attendee, Admin]),
    (Action::ViewOwnTickets, &[Attendee, Organizer, Admin]),
    (Action::CancelTicket, &[Attendee, Organizer, Admin]),
    (Action::ViewOrganizerTickets, &[Organizer, Admin]),
    (Action::ViewAllTickets, &[Admin]),
    (Action::SubmitReview, &[Attendee, Admin]),
    (Action::ViewAdminDashboard, &[Admin]),
    (Action::ViewOrganizerDashboard, &[Organizer]),
];

pub fn allowed_roles(action: Action) -> &'static [Role] {
    POLICY
        .iter()
        .find(|(a, _)| *a == action)
        .map(|(_, roles)| *roles)
        .unwrap_or(&[])
}

pub fn is_allowed(role: Role, action: Action) -> bool {
    allowed_roles(action).contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [Action; 11] = [
        Action::CreateEvent,
        Action::UpdateEvent,
        Action::DeleteEvent,
        Action::BookTicket,
        Action::ViewOwnTickets,
        Action::CancelTicket,
        Action::ViewOrganizerTickets,
        Action::ViewAllTickets,
        Action::SubmitReview,
        Action::ViewAdminDashboard,
        Action::ViewOrganizerDashboard,
    ];

    #[test]
    fn test_every_action_has_exactly_one_rule() {
        for action in ALL_ACTIONS {
            let rules = POLICY.iter().filter(|(a, _)| *a == action).count();
            assert_eq!(rules, 1, "{action:?} should appear once in the policy");
            assert!(!allowed_roles(action).is_empty());
        }
    }

    #[test]
    fn test_attendees_cannot_manage_events() {
        assert!(!is_allowed(Role::Attendee, Action::CreateEvent));
        assert!(!is_allowed(Role::Attendee, Action::DeleteEvent));
        assert!(is_allowed(Role::Organizer, Action::CreateEvent));
        assert!(is_allowed(Role::Admin, Action::UpdateEvent));
    }

    #[test]
    fn test_booking_and_reviews_are_for_attendees_and_admins() {
        assert!(is_allowed(Role::Attendee, Action::BookTicket));
        assert!(!is_allowed(Role::Organizer, Action::BookTicket));
        assert!(is_allowed(Role::Attendee, Action::SubmitReview));
        assert!(!is_allowed(Role::Organizer, Action::SubmitReview));
    }

    #[test]
    fn test_dashboards_are_role_specific() {
        assert!(is_allowed(Role::Admin, Action::ViewAdminDashboard));
        assert!(!is_allowed(Role::Organizer, Action::ViewAdminDashboard));
        assert!(is_allowed(Role::Organizer, Action::ViewOrganizerDashboard));
        assert!(!is_allowed(Role::Attendee, Action::ViewOrganizerDashboard));
        assert!(!is_allowed(Role::Organizer, Action::ViewAllTickets));
    }
}
