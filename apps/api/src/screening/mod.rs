// Resume screening: criteria extraction, per-candidate evaluation, weighted scoring.
// All LLM calls go through llm_client::TextGenerator.

pub mod aggregate;
pub mod batch;
pub mod criteria;
pub mod evaluator;
pub mod export;
pub mod feedback;
pub mod handlers;
pub mod models;
pub mod outcome;
pub mod prompts;
