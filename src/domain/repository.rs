use super::model::shelf::Bookshelf;

/// 永続化の抽象。Infra層が実装する。
/// コレクション全体を1スロットとして読み書きする（差分書き込みはしない）。
pub trait ShelfRepository {
    type Error: std::error::Error + Send + Sync + 'static;

    /// 未保存なら `Ok(None)`（初回起動）
    fn load(&self) -> Result<Option<Bookshelf>, Self::Error>;
    fn save(&self, shelf: &Bookshelf) -> Result<(), Self::Error>;
}
