mod book_service;
mod errors;

pub use book_service::{delete_book, find_books, get_book, register_book, update_book};
pub use errors::{BookApplicationError, Result};
