pub mod remote_document;

pub use remote_document::{entry_to_record, record_to_document};
