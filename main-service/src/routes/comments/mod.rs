mod handler;
pub mod model;

pub use handler::{
    add_comment, edit_comment, find_comment, find_comments_by_admin, find_event_comments,
    find_own_comments, remove_comment, remove_comment_by_admin, search_own_comments,
};
