mod handler;
mod model;

pub use handler::{add_hit, get_stats};
