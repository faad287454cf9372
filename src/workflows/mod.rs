//! Composite operations: issue a request, then wait for the control plane to converge.

pub mod backup;
pub mod cloud;
pub mod cluster;
pub mod k8s;
pub mod license;
pub mod restore;
pub mod rule;
pub mod schedule;
