pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod format;
pub mod logging;
pub mod scheduler;
pub mod sink;
pub mod system;
pub mod ui;
