pub mod article;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod http;
pub mod images;
pub mod layout;
pub mod logging;
pub mod pacing;
pub mod transform;

#[cfg(test)]
mod test_support;
