//! Conductor Core - manager/worker agent delegation
//!
//! This crate provides:
//! - A reasoning engine abstraction over LLM providers
//! - Worker agents with their own function-calling turn loops
//! - A manifest-based capability registry
//! - The manager: delegation planning, sequential execution, and synthesis
//! - Artifact storage, progress events, and configuration

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod store;

pub use agent::registry::{
    ActiveAgentSet, AgentDescriptor, AgentManifest, AgentRegistry, CODE_GENERATOR_AGENT_ID,
};
pub use agent::turn::{FunctionOutcome, FunctionSet, TurnExecutor, TurnStep};
pub use agent::{AgentContext, WorkerAgent, WorkerSession};
pub use config::{Config, ConfigManager, ModelTiers, OrchestratorConfig, ProviderConfig};
pub use error::{Error, FunctionError, Result};
pub use events::{ChannelSink, NullSink, ProgressEvent, ProgressSink, TracingSink};
pub use orchestrator::{
    DelegationExecutor, DelegationOutcome, DelegationRecord, DelegationRequest, Manager,
    ResponseSynthesizer, TurnState, MANAGER_AGENT_ID,
};
pub use provider::{
    create_engine_from_config, EngineMessage, EngineRequest, EngineResponse, FunctionCall,
    FunctionDefinition, GenAIProvider, ModelTier, ReasoningEngine,
};
pub use store::{ArtifactStore, FileArtifactStore, MemoryArtifactStore};
