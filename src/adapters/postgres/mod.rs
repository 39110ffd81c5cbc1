pub mod catalog_store;
pub mod loan_store;

// パブリックに型を再エクスポート
pub use catalog_store::CatalogStore as PostgresCatalogStore;
pub use loan_store::LoanStore as PostgresLoanStore;
