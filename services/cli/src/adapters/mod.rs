pub mod http;
pub mod persistence;
pub mod transfer;

pub use http::{HttpAuthApi, HttpUploadApi};
pub use persistence::FileSessionPersistence;
pub use transfer::HttpObjectTransfer;
