//! Stable element identity across reparses.
//!
//! [`Fingerprint`]s describe where a syntax node sits structurally;
//! the [`Registry`] maps them to [`ElementId`]s that survive a full rebuild
//! of the syntax tree, and [`IdentityPass`] resolves whole trees at once.

pub mod fingerprint;
pub mod id;
pub mod pass;
pub mod registry;

pub use fingerprint::{Fingerprint, Segment};
pub use id::{document_seed, ElementId, IdGenerator};
pub use pass::{Collision, IdentityPass, PassSummary, Resolution, Resolved};
pub use registry::{Anchor, ImportReport, Registry, RegistryState};
