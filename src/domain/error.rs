use super::model::id::BookId;

/// 入力検証エラー。発生時はコレクションを変更しない。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("author must not be empty")]
    EmptyAuthor,

    #[error("year must be a number, got '{0}'")]
    InvalidYear(String),

    #[error("year must be positive, got {0}")]
    NonPositiveYear(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid book: {0}")]
    Validation(#[from] ValidationError),

    #[error("book not found: {0}")]
    BookNotFound(BookId),

    #[error("no book id left: the largest id is already {}", i64::MAX)]
    IdSpaceExhausted,
}
