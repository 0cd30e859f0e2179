//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use bookshelf_mcp::application::service::ShelfService;
use bookshelf_mcp::domain::clock::Clock;
use bookshelf_mcp::domain::model::book::BookForm;
use bookshelf_mcp::domain::model::id::BookId;
use bookshelf_mcp::domain::model::shelf::Bookshelf;
use bookshelf_mcp::domain::repository::ShelfRepository;
use bookshelf_mcp::infra::json_store::{self, JsonStoreError, DEFAULT_STORAGE_KEY};

// =============================================================================
// InMemoryRepo — テスト用リポジトリ
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InMemoryError {
    #[error("in-memory store error: write refused")]
    WriteRefused,
    #[error(transparent)]
    Codec(#[from] JsonStoreError),
}

/// ファイルI/O不要のインメモリ・キーバリューストア。
/// Cloneしたハンドルで同じ中身を覗ける。
#[derive(Clone, Default)]
pub struct InMemoryRepo {
    store: Rc<RefCell<HashMap<String, String>>>,
    saves: Rc<Cell<usize>>,
    fail_writes: Rc<Cell<bool>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みのJSON文字列で初期化する（旧形式の検証用）
    pub fn with_raw(raw: &str) -> Self {
        let repo = Self::new();
        repo.set_raw(raw);
        repo
    }

    pub fn set_raw(&self, raw: &str) {
        self.store
            .borrow_mut()
            .insert(DEFAULT_STORAGE_KEY.to_string(), raw.to_string());
    }

    pub fn raw(&self) -> Option<String> {
        self.store.borrow().get(DEFAULT_STORAGE_KEY).cloned()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl ShelfRepository for InMemoryRepo {
    type Error = InMemoryError;

    fn load(&self) -> Result<Option<Bookshelf>, Self::Error> {
        match self.store.borrow().get(DEFAULT_STORAGE_KEY) {
            Some(raw) => Ok(Some(json_store::decode(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, shelf: &Bookshelf) -> Result<(), Self::Error> {
        if self.fail_writes.get() {
            return Err(InMemoryError::WriteRefused);
        }
        let raw = json_store::encode(shelf)?;
        self.store
            .borrow_mut()
            .insert(DEFAULT_STORAGE_KEY.to_string(), raw);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

// =============================================================================
// StepClock — 呼ぶたびに1秒進む時計
// =============================================================================

pub struct StepClock {
    next: Cell<i64>,
}

impl StepClock {
    pub fn starting_at(millis: i64) -> Self {
        Self {
            next: Cell::new(millis),
        }
    }
}

impl Clock for StepClock {
    fn now_millis(&self) -> i64 {
        let now = self.next.get();
        self.next.set(now + 1_000);
        now
    }
}

/// 止まった時計（同一ミリ秒内の連続追加）
pub struct FrozenClock(pub i64);

impl Clock for FrozenClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

pub type TestService = ShelfService<InMemoryRepo, StepClock>;

pub const START_MILLIS: i64 = 1_700_000_000_000;

// =============================================================================
// TestShelf — 構造化済みテスト用書棚
// =============================================================================

pub struct TestShelf {
    pub service: TestService,
    pub repo: InMemoryRepo,
    pub ids: HashMap<&'static str, BookId>,
}

impl TestShelf {
    pub fn empty() -> Self {
        let repo = InMemoryRepo::new();
        let service = ShelfService::open(repo.clone(), StepClock::starting_at(START_MILLIS))
            .unwrap();
        Self {
            service,
            repo,
            ids: HashMap::new(),
        }
    }

    /// 標準的なテスト用書棚:
    /// ```text
    /// laskar  Laskar Pelangi   / Andrea Hirata          / 2005 / unread
    /// bumi    Bumi Manusia     / Pramoedya Ananta Toer  / 1980 / finished
    /// ronggeng Ronggeng Dukuh Paruk / Ahmad Tohari      / 1982 / unread
    /// ```
    pub fn standard() -> Self {
        let mut shelf = Self::empty();
        shelf.add("laskar", form("Laskar Pelangi", "Andrea Hirata", "2005", false));
        shelf.add("bumi", form("Bumi Manusia", "Pramoedya Ananta Toer", "1980", true));
        shelf.add(
            "ronggeng",
            form("Ronggeng Dukuh Paruk", "Ahmad Tohari", "1982", false),
        );
        shelf
    }

    pub fn add(&mut self, name: &'static str, form: BookForm) -> BookId {
        let id = self.service.add(&form).unwrap().id();
        self.ids.insert(name, id);
        id
    }

    pub fn titles(&self) -> Vec<String> {
        self.service
            .books()
            .iter()
            .map(|b| b.title().to_string())
            .collect()
    }
}

pub fn form(title: &str, author: &str, year: &str, is_complete: bool) -> BookForm {
    BookForm::new(title, author, year, is_complete)
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}
