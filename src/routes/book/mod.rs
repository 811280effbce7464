mod handler;
mod model;

pub use handler::{create_book, get_book, import_book, list_books, search_external};
