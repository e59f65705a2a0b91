pub mod config;
pub mod error;
pub mod file;
pub mod fs;
pub mod storage;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use error::{Error, Result};
pub use file::{File, FileInfo};
pub use fs::{Fs, OpenMode};
pub use storage::{Metadata, RemoteStorage, WriteMode};
