use serde::{Deserialize, Serialize};

use super::{
    BookId, ValidationError,
    commands::{RegisterBook, UpdateBook},
    value_objects::require_non_blank,
};

/// 書籍 - カタログの1レコード
///
/// ISBNは全書籍で一意。登録後に変更できるのは書誌情報（タイトル・著者）のみ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// 純粋関数：書籍を登録する
///
/// タイトル・著者・ISBNはすべて必須。失敗した項目はまとめて返す。
pub fn register_book(cmd: &RegisterBook) -> Result<Book, Vec<ValidationError>> {
    let mut errors = Vec::new();
    require_non_blank("title", &cmd.title, &mut errors);
    require_non_blank("author", &cmd.author, &mut errors);
    require_non_blank("isbn", &cmd.isbn, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Book {
        book_id: BookId::new(),
        title: cmd.title.trim().to_string(),
        author: cmd.author.trim().to_string(),
        isbn: cmd.isbn.trim().to_string(),
    })
}

/// 純粋関数：書誌情報を更新する
///
/// IDとISBNは変わらない。
pub fn revise_bibliography(book: &Book, cmd: &UpdateBook) -> Result<Book, Vec<ValidationError>> {
    let mut errors = Vec::new();
    require_non_blank("title", &cmd.title, &mut errors);
    require_non_blank("author", &cmd.author, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Book {
        title: cmd.title.trim().to_string(),
        author: cmd.author.trim().to_string(),
        ..book.clone()
    })
}
