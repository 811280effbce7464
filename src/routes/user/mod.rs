mod handler;
mod model;

pub use handler::{get_profile, login, logout, public_profile, register, update_profile};
