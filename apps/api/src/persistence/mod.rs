// Problem collection persistence: whole-file replacement with sha-based conflict detection.
// All remote file access goes through github_client.

pub mod collection;
pub mod handlers;
