//! Envbind engine: env-binding patch/merge and placement decision bookkeeping.
//!
//! Everything here is synchronous and works on in-memory values. Nothing logs and
//! nothing talks to a cluster; callers persist the results.

#![forbid(unsafe_code)]

pub mod error;
pub mod merge;
pub mod patch;
pub mod placement;
pub mod policy;
pub mod usage;

pub use error::{ClusterUsage, Error, MergeFailure, Result};
pub use merge::merge_raw_properties;
pub use patch::{
    apply_override_policies, merge_component, patch_application, patch_application_by_env_binding_env,
    patch_components,
};
pub use placement::{
    get_env_binding_policy_status, placement_status, read_placement_decisions, write_placement_decisions,
    PlacementLedger,
};
pub use policy::{find_policy, get_env_binding_policy};
pub use usage::{cluster_usages, ensure_cluster_unused};
