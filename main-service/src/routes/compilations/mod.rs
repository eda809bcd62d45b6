mod handler;
pub mod model;

pub use handler::{
    create_compilation, find_compilation, find_compilations, remove_compilation,
    update_compilation,
};
