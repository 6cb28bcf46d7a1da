//! Shared Kernel - Domain-crossing minimal core
//!
//! Vocabulary shared by every marketplace crate:
//! - Unified error type and result alias
//! - Typed entity IDs
//! - The authenticated actor (`CurrentUser`) and its role
//! - Pagination primitives
//!
//! Only things whose meaning is identical across auth, credentials,
//! marketplace and notifications belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod actor;
pub mod id;
pub mod pagination;
