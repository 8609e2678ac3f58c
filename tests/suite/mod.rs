//! Integration test suite modules

mod config_file;
mod search_stream;
mod session;
