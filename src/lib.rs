pub mod client;
pub mod config;
pub mod error;
pub mod image_processing;
pub mod server;
pub mod storage;
pub mod web_pages;

#[cfg(test)]
mod test_helpers;
