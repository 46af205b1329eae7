//! HTTP middleware: caller identity and admission control.

pub mod admission;
pub mod identity;

pub use admission::{admission_middleware, AdmissionControl};
pub use identity::{identity_middleware, CallerIdentity, RequireUser, USER_ID_HEADER};
