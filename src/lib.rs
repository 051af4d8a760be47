pub mod aggregator_core;
pub mod config;
pub mod pipeline;
pub mod streamer_core;
