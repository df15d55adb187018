//! Capability checks for privileged connection operations.

use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

/// A privileged operation a caller may be authorized to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Hard-terminate a connection.
    Abort,
    /// Change a connection's network timeout.
    SetNetworkTimeout,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Abort => write!(f, "callAbort"),
            Permission::SetNetworkTimeout => write!(f, "setNetworkTimeout"),
        }
    }
}

/// Authorization hook consulted before privileged operations.
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    /// Return `Ok(())` if `permission` is granted, `PermissionDenied` otherwise.
    fn check(&self, permission: Permission) -> Result<()>;
}

/// Grants every permission.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn check(&self, _permission: Permission) -> Result<()> {
        Ok(())
    }
}

/// Grants exactly the listed permissions.
#[derive(Debug, Default, Clone)]
pub struct PermissionSet {
    granted: HashSet<Permission>,
}

impl PermissionSet {
    /// A set granting nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permission to the set.
    pub fn grant(mut self, permission: Permission) -> Self {
        self.granted.insert(permission);
        self
    }

    pub fn is_granted(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }
}

impl AccessPolicy for PermissionSet {
    fn check(&self, permission: Permission) -> Result<()> {
        if self.is_granted(permission) {
            Ok(())
        } else {
            tracing::debug!(%permission, "Permission check failed");
            Err(Error::PermissionDenied(permission))
        }
    }
}
