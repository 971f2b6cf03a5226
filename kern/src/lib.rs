//! A preemptive, priority-based microkernel for the TS-7200 (ARM7TDMI)
//! board: a fixed-size task table, a priority-preemptive scheduler, a
//! synchronous Send/Receive/Reply rendezvous, and a fixed allow-list
//! event/interrupt bridge.
//!
//! # Algorithm Naivety Principles
//!
//! This implementation uses deliberately simple algorithms and fixed-capacity
//! containers instead of a heap:
//!
//! 1. To use safe Rust for as much as possible.
//! 2. To use easily understood and debugged algorithms.
//! 3. To revisit these decisions if they become performance problems.
//!
//! Assumptions enabling this naivety:
//!
//! - The total number of tasks is fixed at build time (`DEFAULT_TASK_CAPACITY`
//!   in the `abi` crate) and small.
//! - There is exactly one kernel, reached only from trap context; no
//!   synchronization primitives are needed around its state.
//!
//! The portable engine (`kernel`, `task`, `event`, `containers`, `syscalls`)
//! builds and tests on the host; only `arch::ts7200` requires the real target.

#![cfg_attr(target_os = "none", no_std)]

pub mod arch;
pub mod containers;
pub mod err;
pub mod event;
pub mod kernel;
pub mod startup;
pub mod syscalls;
pub mod task;
pub mod time;
