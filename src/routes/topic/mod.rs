mod handler;
mod model;

pub use handler::{create_topic, get_topic, list_topics, reply_topic};
