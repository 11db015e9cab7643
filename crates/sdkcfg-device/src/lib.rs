//! Device-side inputs to an sdkcfg resolution run.
//!
//! - **Device database:** family, driver family, and ISA per device identifier
//! - **Device matcher:** support rules evaluated against a device identifier
//! - **Context:** the immutable per-run view of the target (device, RTOS,
//!   enabled modules)
//! - **Toolchain:** library directory of the active build toolchain

pub mod context;
pub mod database;
pub mod error;
pub mod isa;
pub mod matcher;
pub mod rtos;
pub mod toolchain;

pub use context::DeviceContext;
pub use database::{DeviceAttributeSource, DeviceAttributes, DeviceDatabase, FamilyEntry};
pub use error::{DeviceError, Result};
pub use isa::Isa;
pub use matcher::{matches, Clause, CompiledRule, SupportRule};
pub use rtos::RtosKind;
pub use toolchain::{Toolchain, ToolchainResolver};
