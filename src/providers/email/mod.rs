//! Remote mail provider search.
//!
//! - [`RemoteSearch`] - keyword search plus per-message enrichment
//! - [`GmailSearch`] - Gmail REST API implementation

mod gmail;
mod traits;

pub use gmail::GmailSearch;
pub use traits::{ProviderError, RemotePage, RemoteSearch, Result, SearchStub};
