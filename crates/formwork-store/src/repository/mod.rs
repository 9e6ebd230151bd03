//! # Repository Module
//!
//! SQL lives here and nowhere else. Callers go through a repository, or
//! through the [`crate::KeyValueStore`] trait when they only need the
//! three-operation contract.
//!
//! ## Available Repositories
//!
//! - [`kv::KvRepository`] - JSON values by string key

pub mod kv;
