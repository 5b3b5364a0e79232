//! Access modes shared by both protocol backends.

use crate::vocab::acl;
use dupe::Dupe;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

#[cfg(feature = "test_utils")]
use proptest_derive::Arbitrary;

/// A single access mode.
#[cfg_attr(feature = "test_utils", derive(Arbitrary))]
#[derive(
    Debug, Clone, Dupe, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Permission {
    /// Read the content of a resource, or list a container.
    Read,

    /// Modify or delete content.
    Write,

    /// Add content without the ability to modify or delete existing content.
    Append,

    /// Read and modify the access rules themselves.
    Control,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::Read,
        Permission::Write,
        Permission::Append,
        Permission::Control,
    ];

    /// The `acl:` mode IRI for this permission.
    pub fn authorization_list_mode(&self) -> &'static str {
        match self {
            Permission::Read => acl::READ,
            Permission::Write => acl::WRITE,
            Permission::Append => acl::APPEND,
            Permission::Control => acl::CONTROL,
        }
    }

    /// Parses an `acl:` mode IRI. Unknown modes yield `None`.
    pub fn from_authorization_list_mode(iri: &str) -> Option<Self> {
        match iri {
            acl::READ => Some(Permission::Read),
            acl::WRITE => Some(Permission::Write),
            acl::APPEND => Some(Permission::Append),
            acl::CONTROL => Some(Permission::Control),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Permission::Read => write!(f, "Read"),
            Permission::Write => write!(f, "Write"),
            Permission::Append => write!(f, "Append"),
            Permission::Control => write!(f, "Control"),
        }
    }
}

/// Where a grant applies.
#[derive(
    Debug, Clone, Dupe, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AccessScope {
    /// The named resource or container only.
    DirectAccess,

    /// Everything created under a container in the future.
    DefaultAccess,
}

impl AccessScope {
    pub const BOTH: [AccessScope; 2] = [AccessScope::DirectAccess, AccessScope::DefaultAccess];

    pub(crate) fn authorization_list_predicate(&self) -> &'static str {
        match self {
            AccessScope::DirectAccess => acl::ACCESS_TO,
            AccessScope::DefaultAccess => acl::DEFAULT,
        }
    }
}

/// An ordered set of [`Permission`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        PermissionSet(BTreeSet::new())
    }

    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// The `acl:` mode IRIs for this set.
    pub fn to_authorization_list_modes(&self) -> BTreeSet<&'static str> {
        self.iter().map(|p| p.authorization_list_mode()).collect()
    }

    /// Parses `acl:` mode IRIs, dropping any that are not recognised.
    pub fn from_authorization_list_modes<'a, I: IntoIterator<Item = &'a str>>(modes: I) -> Self {
        modes
            .into_iter()
            .filter_map(|iri| {
                let parsed = Permission::from_authorization_list_mode(iri);
                if parsed.is_none() {
                    tracing::warn!(mode = iri, "dropping unknown access mode");
                }
                parsed
            })
            .collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        PermissionSet(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(permissions: [Permission; N]) -> Self {
        permissions.into_iter().collect()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|p| p.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Wire-level mode flags of the Access-Control-Resource protocol.
///
/// `Control` is split into a read half and a write half on the wire. This
/// crate always sets and clears both halves together; a bundle with only one
/// of them set is read back as *no* `Control`.
#[derive(Debug, Clone, Copy, Dupe, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub control_read: bool,
    pub control_write: bool,
}

impl AccessFlags {
    pub fn none() -> Self {
        AccessFlags::default()
    }

    /// Whether any flag is set.
    pub fn any(&self) -> bool {
        self.read || self.write || self.append || self.control_read || self.control_write
    }

    /// Bitwise union.
    pub fn union(self, other: AccessFlags) -> AccessFlags {
        AccessFlags {
            read: self.read || other.read,
            write: self.write || other.write,
            append: self.append || other.append,
            control_read: self.control_read || other.control_read,
            control_write: self.control_write || other.control_write,
        }
    }

    pub fn permissions(&self) -> PermissionSet {
        PermissionSet::from(*self)
    }
}

impl From<&PermissionSet> for AccessFlags {
    fn from(permissions: &PermissionSet) -> Self {
        let control = permissions.contains(Permission::Control);
        AccessFlags {
            read: permissions.contains(Permission::Read),
            write: permissions.contains(Permission::Write),
            append: permissions.contains(Permission::Append),
            control_read: control,
            control_write: control,
        }
    }
}

impl From<AccessFlags> for PermissionSet {
    fn from(flags: AccessFlags) -> Self {
        let mut set = PermissionSet::new();
        if flags.read {
            set.insert(Permission::Read);
        }
        if flags.write {
            set.insert(Permission::Write);
        }
        if flags.append {
            set.insert(Permission::Append);
        }
        if flags.control_read && flags.control_write {
            set.insert(Permission::Control);
        }
        set
    }
}
