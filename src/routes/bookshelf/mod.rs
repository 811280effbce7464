mod handler;
mod model;

pub use handler::{
    add_to_shelf, list_own_shelf, list_user_shelf, remove_from_shelf, shelf_stats,
    update_shelf_entry,
};
