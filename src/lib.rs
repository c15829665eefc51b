//! Parcel desk: package lifecycle and notification escalation for a
//! multi-unit building's concierge desk.
//!
//! The library is split along the system's seams: [`packages`] owns intake,
//! code allocation, the state machine, and the notification queries;
//! [`claims`] is the thin complaint linkage; [`auth`] and [`users`] are the
//! boundaries to the external identity service.

pub mod auth;
pub mod claims;
pub mod config;
pub mod error;
pub mod packages;
pub mod telemetry;
pub mod users;
