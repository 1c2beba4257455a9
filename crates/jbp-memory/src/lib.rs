//! JVM memory sizing for the buildpack's Java runtime.
//!
//! The core of this crate is [`MemoryResolver`], a pure weight-balancing
//! calculation that splits a [`MemoryBudget`] across the JVM's
//! [`MemoryRegion`]s:
//! - explicit per-region overrides are authoritative and taken off the top,
//! - the rest is shared by weight, with per-region minimums enforced by
//!   iterative water-filling,
//! - every size is rounded down to an allocation granularity, so the total
//!   never exceeds the budget.
//!
//! Which flags exist and how they are spelled is left to [`FlagTemplates`].
//! [`WeightBalancingMemoryHeuristic`] ties the resolver to a detected memory
//! limit (`MEMORY_LIMIT` or the process cgroup).

mod cgroup;
mod error;
mod flags;
mod heuristic;
mod limit;
mod resolver;
mod settings;
mod size;
mod types;

pub use cgroup::{parse_cgroup_memory_limit_bytes, parse_proc_self_cgroup, ProcSelfCgroup};
pub use error::{HeuristicError, LimitError, ParseByteSizeError, ResolveError};
pub use flags::{FlagTemplates, SIZE_PLACEHOLDER};
pub use heuristic::{MemoryHeuristic, WeightBalancingMemoryHeuristic};
pub use limit::{MemoryLimitSource, MEMORY_LIMIT_ENV_VAR};
pub use resolver::{resolve, MemoryResolver, ResolvedSizing};
pub use settings::MemorySettings;
pub use size::{format_jvm_size, parse_byte_size, GB, KB, MB, TB};
pub use types::{MemoryBudget, MemoryRegion, RegionOverride};
