use crate::domain::{
    BookId, LoanId,
    loan::{self, Loan, LoanStatus},
};
use crate::ports::loan_store::{LoanFilter, LoanStore as LoanStoreTrait, LoanStoreError, Result};
use crate::ports::pagination::{Page, PageRequest};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};

/// Partial unique index enforcing one open loan per book (see migrations)
const OPEN_LOAN_CONSTRAINT: &str = "loans_one_open_per_book";
const BOOK_CONSTRAINT: &str = "loans_book_fk";

/// PostgreSQLの行データをLoanに変換する
///
/// returned 列は null 許容。null と false はどちらも未返却として復元する。
fn map_row_to_loan(row: &PgRow) -> std::result::Result<Loan, sqlx::Error> {
    let returned: Option<bool> = row.try_get("returned")?;

    Ok(Loan {
        loan_id: LoanId::from_uuid(row.try_get("loan_id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        customer: row.try_get("customer")?,
        customer_email: row.try_get("customer_email")?,
        loan_date: row.try_get("loan_date")?,
        status: LoanStatus::from_returned_flag(returned),
    })
}

fn map_rows(rows: &[PgRow]) -> Result<Vec<Loan>> {
    rows.iter()
        .map(map_row_to_loan)
        .collect::<std::result::Result<_, _>>()
        .map_err(LoanStoreError::backend)
}

/// 一意制約違反を`OpenLoanExists`に、外部キー違反を`BookNotFound`に変換する
fn map_write_error(err: sqlx::Error) -> LoanStoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && db_err.constraint() == Some(OPEN_LOAN_CONSTRAINT) {
            return LoanStoreError::OpenLoanExists;
        }
        if db_err.is_foreign_key_violation() && db_err.constraint() == Some(BOOK_CONSTRAINT) {
            return LoanStoreError::BookNotFound;
        }
    }
    LoanStoreError::backend(err)
}

/// LoanStoreのPostgreSQL実装
///
/// 「1冊につき未返却の貸出は1件まで」は部分一意インデックスで保証する。
pub struct LoanStore {
    pool: PgPool,
}

impl LoanStore {
    /// PostgreSQLコネクションプールから新しいLoanStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStoreTrait for LoanStore {
    /// 貸出を追加する
    ///
    /// 新規貸出の returned は NULL（未確定）として保存する。
    async fn insert(&self, loan: Loan) -> Result<Loan> {
        let returned: Option<bool> = loan.status.is_returned().then_some(true);

        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                book_id,
                customer,
                customer_email,
                loan_date,
                returned
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.book_id.value())
        .bind(&loan.customer)
        .bind(&loan.customer_email)
        .bind(loan.loan_date)
        .bind(returned)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(loan)
    }

    /// 返却状態を更新する（作成後に変更できるのはこの列のみ）
    async fn update(&self, loan: Loan) -> Result<Loan> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET returned = $2
            WHERE loan_id = $1
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.status.as_returned_flag())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(LoanStoreError::backend(format!(
                "loan {} does not exist",
                loan.loan_id
            )));
        }

        Ok(loan)
    }

    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT loan_id, book_id, customer, customer_email, loan_date, returned
            FROM loans
            WHERE loan_id = $1
            "#,
        )
        .bind(loan_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(LoanStoreError::backend)?;

        row.as_ref()
            .map(map_row_to_loan)
            .transpose()
            .map_err(LoanStoreError::backend)
    }

    async fn exists_open_loan_for_book(&self, book_id: BookId) -> Result<bool> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM loans
                WHERE book_id = $1 AND returned IS NOT TRUE
            )
            "#,
        )
        .bind(book_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(LoanStoreError::backend)
    }

    /// 延滞中の貸出を検索
    ///
    /// (loan_date) の部分インデックスを使用する。
    async fn find_overdue(&self, as_of: NaiveDate, threshold_days: u32) -> Result<Vec<Loan>> {
        let cutoff = loan::overdue_cutoff(as_of, threshold_days);

        let rows = sqlx::query(
            r#"
            SELECT loan_id, book_id, customer, customer_email, loan_date, returned
            FROM loans
            WHERE loan_date <= $1 AND returned IS NOT TRUE
            ORDER BY loan_date ASC, loan_id ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(LoanStoreError::backend)?;

        map_rows(&rows)
    }

    /// ISBN または 利用者名 で検索（OR条件）
    ///
    /// 件数とページを同じトランザクションで取得する。
    async fn find_page(&self, filter: &LoanFilter, page: PageRequest) -> Result<Page<Loan>> {
        let mut tx = self.pool.begin().await.map_err(LoanStoreError::backend)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM loans l
            JOIN books b ON b.book_id = l.book_id
            WHERE b.isbn = $1 OR l.customer = $2
            "#,
        )
        .bind(filter.isbn.as_deref())
        .bind(filter.customer.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(LoanStoreError::backend)?;

        let rows = sqlx::query(
            r#"
            SELECT l.loan_id, l.book_id, l.customer, l.customer_email, l.loan_date, l.returned
            FROM loans l
            JOIN books b ON b.book_id = l.book_id
            WHERE b.isbn = $1 OR l.customer = $2
            ORDER BY l.loan_date ASC, l.loan_id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.isbn.as_deref())
        .bind(filter.customer.as_deref())
        .bind(i64::from(page.size))
        .bind(page.offset() as i64)
        .fetch_all(&mut *tx)
        .await
        .map_err(LoanStoreError::backend)?;

        tx.commit().await.map_err(LoanStoreError::backend)?;

        Ok(Page::new(map_rows(&rows)?, total.max(0) as u64, page))
    }

    async fn find_by_book(&self, book_id: BookId, page: PageRequest) -> Result<Page<Loan>> {
        let mut tx = self.pool.begin().await.map_err(LoanStoreError::backend)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1")
            .bind(book_id.value())
            .fetch_one(&mut *tx)
            .await
            .map_err(LoanStoreError::backend)?;

        let rows = sqlx::query(
            r#"
            SELECT loan_id, book_id, customer, customer_email, loan_date, returned
            FROM loans
            WHERE book_id = $1
            ORDER BY loan_date ASC, loan_id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(book_id.value())
        .bind(i64::from(page.size))
        .bind(page.offset() as i64)
        .fetch_all(&mut *tx)
        .await
        .map_err(LoanStoreError::backend)?;

        tx.commit().await.map_err(LoanStoreError::backend)?;

        Ok(Page::new(map_rows(&rows)?, total.max(0) as u64, page))
    }
}
