//! Application layer use cases for the control server.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The application layer sits between the domain types and the
//! infrastructure.  It decides *what* to ask the hypervisor and *in which
//! order*, but reaches it only through the `HypervisorGateway` trait, so
//! none of this code starts a process itself.
//!
//! # Sub-modules
//!
//! - **`orchestrator`** – One entry point per browser operation.  Validates
//!   input, takes the VM's lock, checks the VM is registered, and runs the
//!   invocations.
//!
//! - **`locks`** – The per-VM lock registry.
//!
//! - **`screenshot`** – Screen capture with the placeholder fallback.

pub mod locks;
pub mod orchestrator;
pub mod screenshot;

pub use orchestrator::{ControlError, VmOrchestrator};
