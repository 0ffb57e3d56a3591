//! Live host sampling for `nrm-core`.
//!
//! [`HostGateway`] reads CPU, memory, disk and process counts through
//! `sysinfo` and hands them to the swarm as `RealitySnapshot`s.

pub mod gateway;

pub use gateway::{HostGateway, usage_percent};
