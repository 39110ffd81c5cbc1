pub mod book;
pub mod dependencies;
pub mod loan;

pub use dependencies::ServiceDependencies;
