mod handler;
mod model;

pub use handler::{follow, follow_status, followers, following, unfollow};
