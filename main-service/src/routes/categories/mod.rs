mod handler;
pub mod model;

pub use handler::{
    create_category, find_categories, find_category_by_id, remove_category, update_category,
};
