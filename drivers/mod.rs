// Driver package / 驱动包
pub mod dropbox;
pub mod memory;

use crate::storage::DriverFactory;

/// All built-in driver factories / 所有内置驱动工厂
pub fn factories() -> Vec<Box<dyn DriverFactory>> {
    vec![
        // Dropbox HTTP API v2 driver / Dropbox驱动
        Box::new(dropbox::DropboxDriverFactory),
        // In-process driver for tests and local runs / 内存驱动
        Box::new(memory::MemoryDriverFactory),
    ]
}
