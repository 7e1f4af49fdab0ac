pub mod archive;
pub mod checksum;
pub mod error;

pub use archive::{ArchiveType, detect_archive_type, is_archive, set_executable, unpack_archive};
pub use error::CommonError;
