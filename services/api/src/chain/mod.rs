pub mod registry;
pub mod signer;

pub use registry::{AssignmentParams, AssignmentRegistry};
pub use signer::{RegistrarSigner, SmartAccountSigner};
