pub mod config;
pub mod domain;
pub mod engine;
pub mod services;
pub mod store;

pub use config::Config;
pub use engine::{BatchReport, EngineError, SkipReason, TargetingEngine};
pub use services::scoring::{MemberSignals, RelevanceScorer, ScoreBreakdown, ScoredCandidate};
pub use services::selection::{Selection, SelectionPolicy};
pub use services::sequencer::{DeckSequencer, MemberQueue, QueueReason, QueuedQuestion};
pub use store::{
    DeliveryTracker, GraphStore, InMemoryProfileStore, ProfileStore, UpsertOutcome,
};
