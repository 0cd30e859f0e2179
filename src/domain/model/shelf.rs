use super::book::{Book, BookDraft};
use super::id::BookId;
use crate::domain::error::DomainError;

/// ID指定操作の結果。見つからない場合はエラーではなく `NotFound` として返す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

/// 削除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// 確認が取れて削除した（削除したレコードを返す）
    Removed(Book),
    /// 確認が拒否された。何も変更していない。
    Declined,
    NotFound,
}

/// 読了状態で分けた表示用の並び。元の相対順を保つ。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusPartition<'a> {
    pub incomplete: Vec<&'a Book>,
    pub complete: Vec<&'a Book>,
}

/// 未読を先、読了を後に分ける。何も変更しない。
pub fn partition_by_status<'a, I>(books: I) -> StatusPartition<'a>
where
    I: IntoIterator<Item = &'a Book>,
{
    let (complete, incomplete) = books.into_iter().partition(|b| b.is_complete());
    StatusPartition {
        incomplete,
        complete,
    }
}

/// Bookshelf: 集約ルート。挿入順を保った書籍コレクション。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bookshelf {
    books: Vec<Book>,
}

impl Bookshelf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_books(books: Vec<Book>) -> Self {
        Self { books }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|b| b.id() == id)
    }

    /// 書籍を末尾に追加する。IDは `now_millis` から割り当て、既存IDと衝突しない。
    pub fn add(&mut self, draft: BookDraft, now_millis: i64) -> Result<&Book, DomainError> {
        let id = BookId::allocate(now_millis, self.max_id())
            .ok_or(DomainError::IdSpaceExhausted)?;
        let index = self.books.len();
        self.books.push(Book::from_draft(id, draft));
        Ok(&self.books[index])
    }

    /// 可変フィールドを置き換える。IDと並び順は変わらない。
    pub fn update(&mut self, id: BookId, draft: BookDraft) -> Result<&Book, DomainError> {
        let book = self
            .books
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or(DomainError::BookNotFound(id))?;
        book.apply(draft);
        Ok(&*book)
    }

    pub fn toggle_complete(&mut self, id: BookId) -> Lookup<&Book> {
        match self.books.iter_mut().find(|b| b.id() == id) {
            Some(book) => {
                book.toggle_complete();
                Lookup::Found(&*book)
            }
            None => Lookup::NotFound,
        }
    }

    /// 確認コールバックが true を返した場合のみ削除する。
    /// 対象が無ければコールバックは呼ばれない。
    pub fn remove(&mut self, id: BookId, confirm: impl FnOnce(&Book) -> bool) -> Removal {
        let Some(index) = self.books.iter().position(|b| b.id() == id) else {
            return Removal::NotFound;
        };
        if !confirm(&self.books[index]) {
            return Removal::Declined;
        }
        Removal::Removed(self.books.remove(index))
    }

    /// タイトル部分一致（大文字小文字を区別しない）。空・未指定なら全件。
    pub fn search(&self, keyword: Option<&str>) -> Vec<&Book> {
        match keyword {
            Some(kw) if !kw.is_empty() => {
                self.books.iter().filter(|b| b.title_contains(kw)).collect()
            }
            _ => self.books.iter().collect(),
        }
    }

    fn max_id(&self) -> Option<BookId> {
        self.books.iter().map(|b| b.id()).max()
    }
}
