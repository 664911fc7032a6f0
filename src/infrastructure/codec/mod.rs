pub mod blob_codec;

pub use blob_codec::{content_sha256, BlobCodec, CodecError};
