//! Score-driven provisioning.
//!
//! [`ProvisionInput`] is the unit of work; [`ResourceFactory`] partitions a
//! batch by provider and drives execution; [`ResourceProvisioner`] resolves
//! a score descriptor into a batch and hands it to the factory.

pub mod factory;
pub mod input;
pub mod provisioner;

pub use factory::ResourceFactory;
pub use input::ProvisionInput;
pub use provisioner::ResourceProvisioner;
