mod handler;
pub mod model;

pub use handler::{create_user, find_users, remove_user};
