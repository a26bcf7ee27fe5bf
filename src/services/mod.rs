pub mod classifier;
pub mod enumerator;
pub mod llm_service;
pub mod match_evaluator;
pub mod organizer;
pub mod profile_builder;

pub use classifier::Classifier;
pub use enumerator::enumerate;
pub use llm_service::LlmService;
pub use match_evaluator::{parse_verdict, MatchEvaluator};
pub use organizer::{ResultOrganizer, ORGANIZED_DIR_NAME};
pub use profile_builder::ProfileBuilder;
