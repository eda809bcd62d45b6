pub mod categories;
pub mod comments;
pub mod compilations;
pub mod events;
pub mod requests;
pub mod users;
