//! # Repopulation core
//!
//! Reconciliation engine for refreshing an in-progress `QuestionnaireResponse` with newer
//! server-populated data without silently discarding a clinician's edits.
//!
//! The engine is a set of pure tree transformations:
//! - [`diff::compute_candidates`] walks the questionnaire definition against the
//!   server-populated tree and then the currently-edited tree, producing an ordered change-set
//!   keyed by linkId ([`ItemsToRepopulate`])
//! - a reviewer approves a subset with [`ItemsToRepopulate::select`]
//! - [`merge::merge`] rebuilds the edited tree with exactly the approved answers substituted
//!
//! Repeating groups are compared and replaced as whole instance arrays (see [`repeat_group`]).
//! Items hidden by enableWhen never produce candidates (see [`visibility`]).
//!
//! **No UI or I/O concerns**: fetching the server response, evaluating enableWhen/FHIRPath and
//! persisting the result belong to the host. The host plugs in through the ports in [`store`].

pub mod align;
pub mod candidate;
pub mod config;
pub mod constants;
pub mod context;
pub mod diff;
pub mod equality;
pub mod error;
pub mod merge;
pub mod repeat_group;
pub mod review;
pub mod service;
pub mod store;
pub mod visibility;

#[cfg(test)]
pub(crate) mod test_support;

pub use candidate::{ItemToRepopulate, ItemsToRepopulate, RepopulateValues};
pub use config::RepopulateConfig;
pub use context::{TabProperties, Tabs};
pub use diff::compute_candidates;
pub use error::{RepopError, RepopResult};
pub use merge::merge;
pub use service::RepopulationService;
pub use store::{FormStateReader, FormStateWriter, InMemoryFormStore};
pub use visibility::{is_hidden, EnableWhenState};
