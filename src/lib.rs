pub mod config;
pub mod history;
pub mod pipeline;
pub mod process;
pub mod save;
pub mod store;
