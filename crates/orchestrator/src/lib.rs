//! Coordinates vendor voice calls against the stored request/provider
//! model: dispatches and awaits individual calls, ingests vendor
//! webhooks, fans call batches out with bounded concurrency, scores the
//! survivors into recommendations, and drives a service request through
//! its full lifecycle.

pub mod batch_caller;
pub mod call_mapping;
pub mod cancel;
pub mod direct_caller;
pub mod enricher;
pub mod recommender;
pub mod request_orchestrator;
pub mod search;
pub mod webhook_ingestor;

pub use batch_caller::{BatchCaller, BatchOutcome};
pub use cancel::{CancelMap, CancelToken};
pub use direct_caller::{DirectCallContext, DirectCaller};
pub use enricher::Enricher;
pub use recommender::Recommender;
pub use request_orchestrator::RequestOrchestrator;
pub use search::{SearchAdapter, StaticSearchAdapter};
pub use webhook_ingestor::{IngestOutcome, WebhookIngestor};
