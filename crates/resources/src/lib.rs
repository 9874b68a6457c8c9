#![deny(clippy::pedantic, unsafe_code)]

//! Resource arbitration for seatring
//!
//! This crate provides the monitor that coordinates N workers sharing a ring
//! of N resources. Each worker needs its own resource and its neighbor's;
//! the arbiter bounds the number of seated workers to N - 1 so that the ring
//! of waiting workers can never close.
//!
//! Seats and resources are handed out as RAII handles ([`SeatPermit`],
//! [`ResourceGuard`]). A resource guard borrows the seat it was acquired
//! with, so a seat cannot be given back while its resources are held.

pub mod arbiter;
pub mod guard;
pub mod snapshot;

pub use arbiter::Arbiter;
pub use guard::{ResourceGuard, SeatPermit};
pub use snapshot::{ArbiterSnapshot, ArbiterStats};
