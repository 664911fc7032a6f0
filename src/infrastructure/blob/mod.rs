pub mod fs_blob_service;
pub mod http_blob_service;

pub use fs_blob_service::FsBlobService;
pub use http_blob_service::HttpBlobService;
