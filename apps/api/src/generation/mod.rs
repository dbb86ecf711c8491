// Problem generation: prompt building, model call, reply extraction and normalization.
// All model calls go through llm_client; no direct API calls here.

pub mod extractor;
pub mod generator;
pub mod handlers;
pub mod normalizer;
pub mod prompts;
