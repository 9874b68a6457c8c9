#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Workers and the table run driver for seatring
//!
//! A [`Worker`] walks the seat / pick up / work / put down cycle against a
//! shared [`seatring_resources::Arbiter`]. [`run_table`] spawns one worker
//! task per ring slot, supervises them and returns a [`RunReport`].

pub mod table;
pub mod worker;

pub use table::{run_table, RunReport};
pub use worker::{Worker, WorkerReport};
