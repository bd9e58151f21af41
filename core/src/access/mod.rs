// paygate/src/access/mod.rs

pub mod provisioner;

pub use provisioner::{AccessProvisioner, ProvisionOutcome};
