//! # Ember Hardware Abstraction Layer
//!
//! The one genuinely hardware-specific piece of process startup: installing
//! the processor context that position-independent code expects before the
//! first application instruction runs. Everything else in the runtime is
//! portable arithmetic over declared address ranges; this crate is where the
//! portable world ends and registers begin.

#![no_std]

pub mod arch;
pub mod context;

pub use context::ProcessorContext;
