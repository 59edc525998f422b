//! # itr-state: Filing Lifecycle
//!
//! A filing moves through a strict lifecycle from draft to processed:
//!
//! ```text
//! draft → intake_complete → computed → reviewed → ready_to_submit → submitted → e_verified → processed
//! ```
//!
//! with `rejected` (restartable) and `void` (terminal) side branches. This
//! crate owns that lifecycle and wires the pure engines into it:
//!
//! - [`FilingStatus`] holds the transition table.
//! - [`Actor`] and [`Action`] form the role guard evaluated before it.
//! - [`Filing`] is the aggregate: facts, resolutions, computations,
//!   return versions, submission and callback records.
//! - [`FilingRegistry`] serializes writes per filing, enforces optimistic
//!   revisions and the one-in-progress-filing rule, and drives
//!   reconciliation, computation, document building and submission.
//! - [`ports`] holds the gateway and feed seams.
//!
//! Once submitted, a filing's data never changes again; only the
//! verification and processing callbacks advance it.

pub mod actor;
pub mod error;
pub mod filing;
pub mod ports;
pub mod registry;
pub mod status;
pub mod submission;

pub use actor::{Action, Actor, Role};
pub use error::{FilingError, SubmissionError};
pub use filing::{
    ArchivedSchedule, ComputationRecord, Filing, FilingKey, FilingView, OriginalReturn,
    ReturnVersion, ScheduleAttachment, Submission, SubmissionAttempt, SwitchProposal,
    VerificationRecord,
};
pub use ports::{
    FactFeed, FeedError, FeedRequest, GatewayError, ProcessingEvent, SandboxGateway, StaticFeed,
    SubmissionGateway, VerificationEvent,
};
pub use registry::{FilingRegistry, NewFiling};
pub use status::{FilingStatus, TransitionRecord};
pub use submission::{RetryPolicy, SubmissionReceipt};
