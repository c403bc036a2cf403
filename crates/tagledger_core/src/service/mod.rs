//! Use-case services over storage and external seams.

pub mod registry_service;

pub use registry_service::{RegistryConfig, RegistryError, TagRegistry};
