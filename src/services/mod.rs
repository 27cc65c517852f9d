pub mod insight_service;
pub mod llm_service;
pub mod persistence_service;
pub mod pipeline;
pub mod price_service;
