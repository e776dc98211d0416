/// Shared types for the entraide platform.
///
/// `models` holds the domain vocabulary, `api` the JSON wire schemas, and
/// `conversation` the derivation of conversation threads from the flat
/// message log.
pub mod api;
pub mod conversation;
pub mod models;
