pub mod bands;
pub mod cli;
pub mod config;
pub mod control;
pub mod display;
pub mod error;
pub mod ingest;
pub mod node_id;
pub mod pipeline;
pub mod processor;
pub mod record;
pub mod reporter;
pub mod routes;
pub mod sample;
pub mod sampler;
pub mod sensor;
pub mod state;
pub mod static_assets;
pub mod store;
pub mod thresholds;
pub mod time;

#[cfg(test)]
pub mod test_support;
