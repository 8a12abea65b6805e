use super::repository::{
    AuthorRepository, BookCopyRepository, BookRepository, FineRepository, GenreRepository,
    LibrarianRepository, LoanRepository, MemberRepository, NotificationRepository,
    ReservationRepository, Result,
};
use async_trait::async_trait;

/// Unit of Workポート
///
/// 同じ永続化セッションを共有するリポジトリの集まり。1つの操作の間だけ使い、
/// 操作をまたいで共有しない。
/// 各リポジトリに登録された変更はsave_changesでまとめて反映される。
///
/// begin_transactionからcommit/rollbackまでの間は、
/// save_changesで反映した内容もrollbackで取り消される。
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn books(&self) -> &dyn BookRepository;
    fn book_copies(&self) -> &dyn BookCopyRepository;
    fn authors(&self) -> &dyn AuthorRepository;
    fn genres(&self) -> &dyn GenreRepository;
    fn loans(&self) -> &dyn LoanRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn fines(&self) -> &dyn FineRepository;
    fn members(&self) -> &dyn MemberRepository;
    fn librarians(&self) -> &dyn LibrarianRepository;
    fn notifications(&self) -> &dyn NotificationRepository;

    /// 登録済みの変更をすべて反映する
    ///
    /// 反映した変更の件数を返す。失敗した場合、登録済みの変更は破棄される。
    async fn save_changes(&self) -> Result<usize>;

    async fn begin_transaction(&self) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    /// トランザクション開始時点の状態に戻し、未反映の変更も破棄する
    async fn rollback(&self) -> Result<()>;
}

/// 操作ごとのUnit of Workを作る
///
/// 作られたUnit of Workは登録中の変更とトランザクションをそれぞれ独立に持つ。
/// 反映済みの内容だけが共通の永続化先を通じて見える。
pub trait UnitOfWorkFactory: Send + Sync {
    fn create(&self) -> Box<dyn UnitOfWork>;
}
