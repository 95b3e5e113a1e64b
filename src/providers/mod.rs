//! External service providers.
//!
//! - [`email`] - Remote mail search (Gmail API)

pub mod email;
