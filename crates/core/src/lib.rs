pub mod agent;
pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod parse;
pub mod pipeline;
pub mod reasoner;
pub mod refine;
pub mod report;
pub mod retry;
pub mod selectors;
pub mod spa;
pub mod tools;
pub mod validate;

pub use agent::{AgentConfig, ExplorationAgent, ExplorationState, History, HistoryEntry, StateSummary, TerminationReason};
pub use classify::{PageContext, UrlClassifier};
pub use config::{ScoutConfig, ScoutConfigBuilder};
pub use error::{Result, ScoutError};
pub use fetch::{FetchConfig, FetchedPage, FileFetcher, HttpFetcher, PageFetcher};
pub use llm::{LlmConfig, LlmReasoner};
pub use parse::Document;
pub use pipeline::{GenerationReport, Generator, Outcome};
pub use reasoner::{Decision, Proposal, ProposalContext, Reasoner, Revision, Step, TokenUsage, ToolCall};
pub use refine::{RefinementAttempt, RefinementController, RefinementOutcome};
pub use report::{BatchSummary, write_report};
pub use retry::RetryPolicy;
pub use selectors::{Field, SelectorPatch, SelectorSet};
pub use spa::{SpaEvidence, assess};
pub use validate::{PageRole, SamplePage, SelectorValidator, ValidationResult, validate};
