mod handler;
pub mod model;

pub use handler::{
    create_event, find_event_requests, find_events_by_admin, find_initiator_event,
    find_initiator_events, find_published_event, find_published_events, update_event_by_admin,
    update_initiator_event, update_request_statuses,
};
