pub mod config;
pub mod db;
pub mod format;
pub mod omdb;
pub mod output;
pub mod search;
