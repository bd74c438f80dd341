//! Database models split into domain-specific modules.

pub mod application;
pub mod common;
pub mod job;
pub mod notification;
pub mod user;

pub use application::*;
pub use common::*;
pub use job::*;
pub use notification::*;
pub use user::*;
