//! Core types, policy and services for the gym membership system.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::GymStore`]; everything else talks to
//! [`Gym`].

pub mod account;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod member;
pub mod notification;
pub mod payment;
pub mod rbac;
pub mod service;
pub mod store;

pub use error::{Error, Result};
pub use service::{Gym, Settings};
