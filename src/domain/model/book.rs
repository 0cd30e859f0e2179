use serde::{Deserialize, Serialize};

use super::id::BookId;
use crate::domain::error::ValidationError;

/// 書籍レコード。Bookshelfが所有し、Bookshelfを通じて変更する。
///
/// 永続化時のフィールド名は `id`, `title`, `author`, `year`, `isComplete`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    year: u32,
    is_complete: bool,
}

impl Book {
    pub(crate) fn from_draft(id: BookId, draft: BookDraft) -> Self {
        Self {
            id,
            title: draft.title,
            author: draft.author,
            year: draft.year,
            is_complete: draft.is_complete,
        }
    }

    /// 永続化済みの値からそのまま復元する（検証済みであること）。
    pub(crate) fn restore(
        id: BookId,
        title: String,
        author: String,
        year: u32,
        is_complete: bool,
    ) -> Self {
        Self {
            id,
            title,
            author,
            year,
            is_complete,
        }
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// タイトルに `keyword` を含むか（大文字小文字を区別しない）
    pub fn title_contains(&self, keyword: &str) -> bool {
        self.title
            .to_lowercase()
            .contains(&keyword.to_lowercase())
    }

    // --- 内部操作（Bookshelf経由でのみ呼ばれる） ---

    /// IDを保ったまま可変フィールドを置き換える。
    pub(crate) fn apply(&mut self, draft: BookDraft) {
        self.title = draft.title;
        self.author = draft.author;
        self.year = draft.year;
        self.is_complete = draft.is_complete;
    }

    pub(crate) fn toggle_complete(&mut self) {
        self.is_complete = !self.is_complete;
    }
}

/// UIから渡される未検証の入力。フォームの値をそのまま文字列で持つ。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub year: String,
    pub is_complete: bool,
}

impl BookForm {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: impl Into<String>,
        is_complete: bool,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            year: year.into(),
            is_complete,
        }
    }

    /// 既存レコードの値で埋めたフォーム（編集開始時）
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year.to_string(),
            is_complete: book.is_complete,
        }
    }

    pub fn validate(&self) -> Result<BookDraft, ValidationError> {
        BookDraft::new(&self.title, &self.author, &self.year, self.is_complete)
    }
}

/// 検証済みの可変フィールド一式。add/update の境界でのみ作られる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    title: String,
    author: String,
    year: u32,
    is_complete: bool,
}

impl BookDraft {
    pub fn new(
        title: &str,
        author: &str,
        year: &str,
        is_complete: bool,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let author = author.trim();
        if author.is_empty() {
            return Err(ValidationError::EmptyAuthor);
        }
        let year = parse_year(year)?;

        Ok(Self {
            title: title.to_string(),
            author: author.to_string(),
            year,
            is_complete,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }
}

fn parse_year(raw: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    let n: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::InvalidYear(trimmed.to_string()))?;
    if n <= 0 {
        return Err(ValidationError::NonPositiveYear(n));
    }
    u32::try_from(n).map_err(|_| ValidationError::InvalidYear(trimmed.to_string()))
}
