//! Preparation queue domain.
//!
//! Holds everything that does not depend on a transport or storage
//! technology:
//!
//! - [`status`] / [`preparation`]: the preparation record and its linear
//!   status machine.
//! - [`allocator`]: queue position assignment and renumbering.
//! - [`waiting_list`]: the precedence-ordered view across sub-queues.
//! - [`store`] / [`order_info`]: the ports adapters implement.
//! - [`service`]: the use cases tying the pieces together.
//! - [`memory`]: in-process adapters used by tests and local tooling.

pub mod allocator;
pub mod error;
pub mod memory;
pub mod order_info;
pub mod preparation;
pub mod service;
pub mod status;
pub mod store;
pub mod types;
pub mod waiting_list;
