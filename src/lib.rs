pub mod avatar;
pub mod classifier;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod pose;
pub mod scheduler;
pub mod stream;
pub mod window;
