pub mod storage;

pub use storage::{file_name_of, DirectoryHandle, FileRef, ScanSource, WriteHandle};
