//! Algebraic intermediate representation of the Quartz VM: the master-table
//! column layout of the ten execution-trace tables, the typed challenge set,
//! the cross-table argument kernels, the AIR constraint groups, and the
//! public claim, parameter, and proof types.

pub mod challenges;
pub mod claim;
pub mod columns;
pub mod constraints;
pub mod cross_table;
pub mod deep;
pub mod parameters;
pub mod proof;

pub use challenges::Challenges;
pub use claim::{Claim, CLAIM_VERSION};
pub use columns::{TableKind, NUM_AUX_COLUMNS, NUM_MAIN_COLUMNS, NUM_TABLES};
pub use constraints::{constraint_counts, ConstraintCounts, Terminals};
pub use parameters::{ParameterError, StarkParameters};
pub use proof::{Proof, RowOpening};
