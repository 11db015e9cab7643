//! Module resolution for sdkcfg.
//!
//! One run takes a [`DeviceContext`](sdkcfg_device::DeviceContext) and the
//! module registry and produces a [`BuildDescriptor`]:
//!
//! 1. **Prepare:** compile each module's support rule and merge the variant
//!    fragment for the device
//! 2. **Gate:** decide active modules, co-requisites first
//! 3. **Link:** format library paths for the toolchain, ISA, and secure
//!    state
//! 4. **Collect:** template contributions and derived constants
//!
//! Runs share nothing mutable, so independent contexts can be resolved in
//! parallel with [`resolve_batch`].

pub mod build;
pub mod constants;
pub mod error;
pub mod gate;
pub mod link;
pub mod report;
pub mod resolution;
pub mod templates;

pub use build::{BuildDescriptor, DeviceSummary, ResolvedModule};
pub use error::{ConfigError, ErrorKind, Result};
pub use gate::{gate, Activation, Candidate, GateDecision, Inactive, ModuleGate};
pub use link::{build_link_descriptor, is_secure_capable, LinkDescriptor, LinkTarget};
pub use report::{format_inactive, format_report};
pub use resolution::{prepare, resolve, resolve_batch};
pub use templates::{collect, TemplateContribution};
