use serde::{Deserialize, Serialize};

use crate::domain::model::book::Book;
use crate::domain::model::shelf::StatusPartition;

/// 表示用の書籍DTO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookEntry {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub year: u32,
    pub is_complete: bool,
}

impl From<&Book> for BookEntry {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id().get(),
            title: book.title().to_string(),
            author: book.author().to_string(),
            year: book.year(),
            is_complete: book.is_complete(),
        }
    }
}

/// 未読・読了の2グループに分けた書棚ビュー（検索結果を含む）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub incomplete: Vec<BookEntry>,
    pub complete: Vec<BookEntry>,
}

impl ShelfView {
    pub fn new(keyword: Option<&str>, parts: &StatusPartition<'_>) -> Self {
        Self {
            keyword: keyword.filter(|k| !k.is_empty()).map(str::to_string),
            incomplete: parts.incomplete.iter().map(|b| BookEntry::from(*b)).collect(),
            complete: parts.complete.iter().map(|b| BookEntry::from(*b)).collect(),
        }
    }

    pub fn total(&self) -> usize {
        self.incomplete.len() + self.complete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// ビュー → テキスト変換
pub struct ShelfRenderer;

impl ShelfRenderer {
    /// Markdown形式。未読セクション、読了セクションの順。
    pub fn render_markdown(view: &ShelfView) -> String {
        let mut buf = String::new();

        match &view.keyword {
            Some(kw) => buf.push_str(&format!("# Bookshelf: search \"{kw}\"\n\n")),
            None => buf.push_str("# Bookshelf\n\n"),
        }

        Self::render_group("Unread", &view.incomplete, &mut buf);
        buf.push('\n');
        Self::render_group("Finished", &view.complete, &mut buf);

        buf
    }

    pub fn render_json(view: &ShelfView) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(view)
    }

    /// 1冊分の詳細（編集フォームに流し込む値）
    pub fn render_book(book: &Book) -> String {
        let status = if book.is_complete() {
            "finished"
        } else {
            "unread"
        };
        format!(
            "[{}] {}\nauthor: {}\nyear: {}\nstatus: {}\n",
            book.id(),
            book.title(),
            book.author(),
            book.year(),
            status
        )
    }

    pub fn render_line(entry: &BookEntry) -> String {
        format!(
            "- [{}] {} by {} ({})",
            entry.id, entry.title, entry.author, entry.year
        )
    }

    fn render_group(heading: &str, entries: &[BookEntry], buf: &mut String) {
        buf.push_str(&format!("## {} ({})\n\n", heading, entries.len()));
        if entries.is_empty() {
            buf.push_str("_none_\n");
            return;
        }
        for entry in entries {
            buf.push_str(&Self::render_line(entry));
            buf.push('\n');
        }
    }
}
