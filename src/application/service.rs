use crate::domain::clock::{Clock, SystemClock};
use crate::domain::model::book::{Book, BookForm};
use crate::domain::model::id::BookId;
use crate::domain::model::shelf::{partition_by_status, Bookshelf, Lookup, Removal};
use crate::domain::repository::ShelfRepository;

use super::error::AppError;
use super::view::ShelfView;

/// 書棚に対するユースケース。
/// メモリ上のコレクションを唯一の正とし、変更のたびに全体を永続化する。
/// 変更はコピーに対して行い、保存に成功してから反映する。
pub struct ShelfService<R: ShelfRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
    shelf: Bookshelf,
}

impl<R: ShelfRepository> ShelfService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: ShelfRepository, C: Clock> ShelfService<R, C> {
    /// 空のコレクションで作る。永続化済みの内容は `load` で読み込む。
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self {
            repo,
            clock,
            shelf: Bookshelf::new(),
        }
    }

    /// 作成してすぐ `load` する。
    pub fn open(repo: R, clock: C) -> Result<Self, AppError> {
        let mut svc = Self::with_clock(repo, clock);
        svc.load()?;
        Ok(svc)
    }

    /// 永続化済みコレクションでメモリ上の状態を丸ごと置き換える。
    /// 未保存なら空（初回起動）。
    pub fn load(&mut self) -> Result<(), AppError> {
        let loaded = self
            .repo
            .load()
            .map_err(|e| AppError::Storage(Box::new(e)))?;
        match loaded {
            Some(shelf) => {
                tracing::info!(books = shelf.len(), "loaded bookshelf");
                self.shelf = shelf;
            }
            None => {
                tracing::info!("no saved bookshelf, starting empty");
                self.shelf = Bookshelf::new();
            }
        }
        Ok(())
    }

    /// 現在のコレクションを保存する。
    pub fn save(&self) -> Result<(), AppError> {
        self.persist(&self.shelf)
    }

    /// 書籍を追加する。
    pub fn add(&mut self, form: &BookForm) -> Result<Book, AppError> {
        let draft = form.validate()?;
        let mut next = self.shelf.clone();
        let book = next.add(draft, self.clock.now_millis())?.clone();
        self.commit(next)?;
        tracing::info!(id = %book.id(), title = book.title(), "book added");
        Ok(book)
    }

    /// 書籍を更新する。IDは変わらない。
    pub fn update(&mut self, id: BookId, form: &BookForm) -> Result<Book, AppError> {
        let draft = form.validate()?;
        let mut next = self.shelf.clone();
        let book = next.update(id, draft)?.clone();
        self.commit(next)?;
        tracing::info!(id = %id, "book updated");
        Ok(book)
    }

    /// 読了状態を反転する。対象が無ければ何もしない。
    pub fn toggle_complete(&mut self, id: BookId) -> Result<Lookup<Book>, AppError> {
        let mut next = self.shelf.clone();
        let Lookup::Found(book) = next.toggle_complete(id).map(Book::clone) else {
            tracing::debug!(id = %id, "toggle: book not found");
            return Ok(Lookup::NotFound);
        };
        self.commit(next)?;
        tracing::info!(id = %id, complete = book.is_complete(), "book status toggled");
        Ok(Lookup::Found(book))
    }

    /// 確認が取れた場合のみ削除する。対象が無ければ確認せずに何もしない。
    pub fn delete(
        &mut self,
        id: BookId,
        confirm: impl FnOnce(&Book) -> bool,
    ) -> Result<Removal, AppError> {
        let mut next = self.shelf.clone();
        let removal = next.remove(id, confirm);
        match &removal {
            Removal::Removed(_) => {
                self.commit(next)?;
                tracing::info!(id = %id, "book deleted");
            }
            Removal::Declined => tracing::debug!(id = %id, "delete declined"),
            Removal::NotFound => tracing::debug!(id = %id, "delete: book not found"),
        }
        Ok(removal)
    }

    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.shelf.get(id)
    }

    pub fn books(&self) -> &[Book] {
        self.shelf.books()
    }

    pub fn shelf(&self) -> &Bookshelf {
        &self.shelf
    }

    /// タイトル検索。空・未指定なら全件を元の順で返す。
    pub fn search(&self, keyword: Option<&str>) -> Vec<&Book> {
        self.shelf.search(keyword)
    }

    /// 検索 → 読了状態で分割した表示用ビュー
    pub fn view(&self, keyword: Option<&str>) -> ShelfView {
        let parts = partition_by_status(self.search(keyword));
        ShelfView::new(keyword, &parts)
    }

    // --- private ---

    fn commit(&mut self, next: Bookshelf) -> Result<(), AppError> {
        self.persist(&next)?;
        self.shelf = next;
        Ok(())
    }

    fn persist(&self, shelf: &Bookshelf) -> Result<(), AppError> {
        self.repo
            .save(shelf)
            .map_err(|e| AppError::Storage(Box::new(e)))
    }
}
