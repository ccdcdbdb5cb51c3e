//! contact-relay: a contact-form submission pipeline.
//!
//! Takes user-entered contact details, sanitizes and validates them, keeps
//! an in-progress draft across restarts, spaces submissions at least five
//! seconds apart, delivers through exactly one configured channel
//! (EmailJS, Web3Forms, or a custom endpoint) and reports every outcome
//! as a self-expiring notification.
//!
//! See `DESIGN.md` for the component map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod draft;
pub mod form;
pub mod limiter;
pub mod logging;
pub mod providers;
pub mod toast;
pub mod validation;
