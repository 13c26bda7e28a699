//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`]: the caller identified by a Bearer token.
//! - [`auth::ClientIp`]: best-effort caller address for audit entries.
//! - [`rbac`]: `RequireSuperAdmin`, `RequireAdmin`, `RequireStaff`,
//!   `RequireViewer`.

pub mod auth;
pub mod rbac;
