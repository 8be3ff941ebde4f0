//! Fingir: Cross-Collaborator Invocation-Sequence Verification
//!
//! Fingir (Spanish: "to fake/pretend") is the sequencing engine of a
//! mocking/test-double framework: given a declarative script of expected
//! calls across several independently-created mock objects, it decides,
//! synchronously as each real invocation arrives, whether that call was
//! allowed to happen now, and whether the whole script was ultimately
//! satisfied.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      FINGIR Architecture                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  declare   ┌────────────┐  gates   ┌───────────┐  │
//! │  │ Test code │───────────►│ Script     │─────────►│ External  │  │
//! │  │           │            │ Registry   │          │ setup     │  │
//! │  └───────────┘            └─────┬──────┘          │ mechanism │  │
//! │                                 │                 └─────┬─────┘  │
//! │                           ┌─────▼──────┐   on_invocation │       │
//! │                           │ Cursor     │◄────────────────┘       │
//! │                           │ + Ledger   │                         │
//! │                           └─────┬──────┘                         │
//! │                           ┌─────▼──────┐                         │
//! │                           │ Verifier   │                         │
//! │                           └────────────┘                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never decides *what* a call returns, only *whether* it was
//! admissible now. Integration with the response-configuration pipeline is
//! explicit dependency injection through [`SetupMechanism`] and per-step
//! [`SequenceGate`]s; there is no ambient state and no interception.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod cursor;
mod ledger;
mod report;
mod result;
mod script;
mod sequence;
mod setup;
mod shape;
mod times;
mod verifier;

/// Proptest strategies for sequence scripts
///
/// Strategy functions are available behind the `proptest` feature; the
/// plain edge-case helpers are always available.
pub mod strategies;


pub use report::{InvocationReport, SequenceReport, StepReport};
pub use result::{ErrorKind, FingirError, FingirResult};
pub use sequence::{CallSequence, SequenceConfig, StepHandle, Verdict};
pub use setup::{RecordingSetup, SequenceGate, SetupMechanism};
pub use shape::{CallShape, Collaborator, CollaboratorId};
pub use times::Times;
