pub mod background;
pub mod checks;
pub mod cli;
pub mod color;
pub mod config;
pub mod core;
pub mod discover;
pub mod engine;
pub mod exit;
pub mod identity;
pub mod logs;
pub mod page;
pub mod suppress;
pub mod ui;
pub mod vision;
