//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the table row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod audit;
pub mod category;
pub mod employee;
pub mod meeting;
pub mod notification;
pub mod project;
pub mod request;
pub mod setting;
pub mod transaction;
pub mod user;
