//! Parametric Kernel Core
//!
//! This crate contains the structural side of the kernel:
//! - AssemblyTree: arena-backed hierarchy of parts and sub-assemblies
//! - KernelConfig: tolerances and evaluation settings (RON on disk)
//! - Session: explicitly constructed editing context with locked shared state

pub mod assembly;
pub mod config;
pub mod constants;
pub mod session;

pub use assembly::*;
pub use config::*;
pub use constants::*;
pub use session::*;
