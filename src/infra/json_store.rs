use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::model::book::Book;
use crate::domain::model::id::BookId;
use crate::domain::model::shelf::Bookshelf;
use crate::domain::repository::ShelfRepository;

/// 書棚を保存する既定のキー
pub const DEFAULT_STORAGE_KEY: &str = "BOOKSHELF_APPS";

/// 書き込み時のフォーマットバージョン
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported storage format version: {0}")]
    UnsupportedVersion(u64),
    #[error("invalid storage key: '{0}'")]
    InvalidKey(String),
}

/// 書き込み形式（バージョン付きエンベロープ）
#[derive(Serialize)]
struct StoredShelfRef<'a> {
    version: u32,
    books: &'a [Book],
}

/// 読み込み時のエンベロープ。`books` はバージョン確認後にデコードする。
#[derive(Deserialize)]
struct StoredEnvelope {
    version: u64,
    books: serde_json::Value,
}

/// 旧形式（レコード配列そのもの）の1件。年は検証されずに保存されていた。
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyBook {
    id: BookId,
    title: String,
    author: String,
    year: i64,
    is_complete: bool,
}

impl LegacyBook {
    /// 正の年を持つレコードだけを復元する。
    fn into_book(self) -> Option<Book> {
        let year = u32::try_from(self.year).ok().filter(|y| *y > 0)?;
        Some(Book::restore(
            self.id,
            self.title,
            self.author,
            year,
            self.is_complete,
        ))
    }
}

/// キーごとに1 JSONファイルを持つキー・バリューストアによるShelfRepository実装。
/// スロットは `<dir>/<key>.json`。
#[derive(Debug, Clone)]
pub struct JsonShelfRepository {
    path: PathBuf,
}

impl JsonShelfRepository {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Result<Self, JsonStoreError> {
        validate_key(key)?;
        Ok(Self {
            path: dir.as_ref().join(format!("{key}.json")),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ShelfRepository for JsonShelfRepository {
    type Error = JsonStoreError;

    fn load(&self) -> Result<Option<Bookshelf>, Self::Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        decode(&content).map(Some)
    }

    fn save(&self, shelf: &Bookshelf) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = encode(shelf)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// 書棚をスロット用のJSON文字列に変換する。
pub fn encode(shelf: &Bookshelf) -> Result<String, JsonStoreError> {
    let stored = StoredShelfRef {
        version: FORMAT_VERSION,
        books: shelf.books(),
    };
    Ok(serde_json::to_string_pretty(&stored)?)
}

/// スロットのJSON文字列から書棚を復元する。
///
/// 配列なら旧形式、それ以外はバージョン付きエンベロープとして読む。
pub fn decode(content: &str) -> Result<Bookshelf, JsonStoreError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if value.is_array() {
        return decode_legacy(value);
    }
    let envelope: StoredEnvelope = serde_json::from_value(value)?;
    if envelope.version != u64::from(FORMAT_VERSION) {
        return Err(JsonStoreError::UnsupportedVersion(envelope.version));
    }
    let books: Vec<Book> = serde_json::from_value(envelope.books)?;
    Ok(Bookshelf::from_books(books))
}

/// 旧形式では年が0以下のレコードも保存され得た。それらは読み飛ばして警告する。
fn decode_legacy(value: serde_json::Value) -> Result<Bookshelf, JsonStoreError> {
    let records: Vec<LegacyBook> = serde_json::from_value(value)?;
    let mut books = Vec::with_capacity(records.len());
    for record in records {
        let (id, year) = (record.id, record.year);
        match record.into_book() {
            Some(book) => books.push(book),
            None => tracing::warn!(id = %id, year, "skipping legacy book with invalid year"),
        }
    }
    Ok(Bookshelf::from_books(books))
}

fn validate_key(key: &str) -> Result<(), JsonStoreError> {
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(JsonStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
