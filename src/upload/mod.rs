//! Upload validation: filename-derived ownership keys and size-bounded
//! receiving of the payload.

mod filename;
mod receiver;

pub use filename::{
    DELIMITER, FilenameConvention, FilenameError, KeyShape, OwningEntityKey, extract_key,
};
pub use receiver::{
    CHUNK_SIZE, Committed, UploadBudget, UploadError, receive_seekable, receive_stream,
};
