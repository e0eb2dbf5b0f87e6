//! Shared request records and error shapes for the Carapace API.
//!
//! Nothing here talks to the network. The records are built once per tool
//! call, validated, serialized into the request body and dropped.

pub mod contribution;
pub mod error;
pub mod query;

pub use contribution::{ContributionDraft, ContributionPatch};
pub use error::{RemoteError, RemoteErrorBody, ValidationError, describe_failure};
pub use query::QueryRequest;
