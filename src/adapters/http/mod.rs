//! HTTP adapters - REST client for the pipeline backend.

mod pipeline_client;

pub use pipeline_client::HttpPipelineApi;
