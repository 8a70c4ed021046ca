//! Shared wire/domain types for the orchestrator: entities, the deterministic
//! id scheme, the queue wire shape, the Coderunner adapter envelope, and
//! bounded-string helpers. No I/O lives here — just data and the invariants
//! that are cheap to express as types.

pub mod artifact;
pub mod coderunner;
pub mod idempotency;
pub mod ids;
pub mod queue;
pub mod repo;
pub mod run;
pub mod station_execution;
pub mod truncate;

pub use artifact::{Artifact, ArtifactStorage, ArtifactType};
pub use coderunner::{
    CoderunnerError, CoderunnerRepoRef, CoderunnerTaskInput, ErrorCategory, ResumeHandle,
    StationExecutionResponse, StationOutcome,
};
pub use idempotency::{ClaimStatus, IdempotencyClaim, CLAIM_GRACE_WINDOW_SECONDS, QUEUE_PUBLISH_FAILED_REASON};
pub use ids::{artifact_id, station_execution_id};
pub use queue::{DeliveryOutcome, RunQueueMessage};
pub use repo::{NewRepo, Repo, DEFAULT_BRANCH};
pub use run::{PrMode, Run, RunStatus, Station, STATION_ORDER};
pub use station_execution::{StationExecution, StationMetadata, StationStatus};
pub use truncate::{excerpt_logs, truncate_summary, truncate_with_marker, LogExcerpt, LOG_EXCERPT_LIMIT, SUMMARY_LIMIT};
