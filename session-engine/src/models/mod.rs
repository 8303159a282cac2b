mod claims;
mod device;
mod pending;
mod permission;
mod session;
mod signature;
mod token;

pub use claims::AccessClaims;
pub use device::{default_device_label, DeviceIdentity};
pub use pending::{LoginContext, OrgRegistration, PendingRegistration};
pub use permission::{ActionFlags, PermissionAction, PermissionSet, ResourceGrant};
pub use session::{Session, UserDetails};
pub use signature::{SignatureOrder, SignatureStatus};
pub use token::TokenPair;
