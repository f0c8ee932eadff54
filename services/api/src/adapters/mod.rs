pub mod db;
pub mod r2;

pub use db::DbAdapter;
pub use r2::R2Storage;
