//! apicompat engine - compatibility classification
//!
//! This crate turns a structural [`ApiDiff`](apicompat_core::ApiDiff) into
//! classified findings:
//! - Diff traversal over schema diff trees
//! - Rule catalogue and variance classification
//! - Deprecation and sunset lifecycle policy
//! - Message localization

pub mod catalog;
pub mod checker;
pub mod context;
pub mod lifecycle;
pub mod localizer;
pub mod rules;
pub mod walk;

pub use catalog::{Action, CatalogError, Direction, Key, RuleEntry, Site, Subject};
pub use checker::Checker;
pub use context::{OperationRef, RuleContext, Sources};
pub use lifecycle::{Decision, LifecycleState, Stability, Sunset};
pub use localizer::{render, English, Localizer};
pub use walk::{walk, walk_added, walk_deleted, walk_modified, Access, Leaf, Visit, Visitor};
