// REST data-store client (PostgREST-compatible endpoint).

mod client;
mod query;

pub use client::RestClient;
pub use query::Query;
