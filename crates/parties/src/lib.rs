//! Parties domain module: the clients invoices are issued to.
//!
//! Clients are referenced by invoices, never owned or mutated by them. This crate
//! only holds the record shape and its validation rules (no IO, no storage).

pub mod client;

pub use client::{Client, ClientStatus, ContactInfo, FiscalInfo};
