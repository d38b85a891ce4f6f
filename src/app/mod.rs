pub mod config;
pub mod crawl;
pub mod data_io;
pub mod error;
pub mod remote;
pub mod runtime;
pub mod tui;
pub mod types;
pub mod ui_utils;

pub use runtime::run;
