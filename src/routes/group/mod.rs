mod handler;
mod model;

pub use handler::{create_group, get_group, join_group, leave_group, list_groups};
