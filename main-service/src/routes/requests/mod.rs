mod handler;
pub mod model;

pub use handler::{add_request, cancel_request, find_user_requests};
