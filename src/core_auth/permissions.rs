use crate::core_auth::AuthError;
use crate::core_vfs::path::clean_virtual_path;
use crate::users::User;

/// Kinds of filesystem access a protocol command can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Delete,
    List,
}

/// The permission gate. Every filesystem-touching protocol operation goes
/// through here before the VFS performs any host I/O.
///
/// Read and list are always allowed for authenticated users; write and
/// delete additionally require a read-write account. The requested path must
/// sit inside the user's home sub-tree.
pub fn check_permission(
    user: Option<&User>,
    virtual_path: &str,
    perm: Permission,
) -> Result<(), AuthError> {
    let user = user.ok_or(AuthError::NotAuthenticated)?;

    let path = clean_virtual_path(virtual_path);
    let home = user.home();

    if !path_within(&path, home) {
        return Err(AuthError::OutsideHome {
            path,
            home: home.to_string(),
        });
    }

    match perm {
        Permission::Read | Permission::List => Ok(()),
        Permission::Write | Permission::Delete => {
            if user.is_read_only() {
                Err(AuthError::ReadOnly(user.name.clone()))
            } else {
                Ok(())
            }
        }
    }
}

/// Boundary-aware prefix check: `/publicX` is not within `/public`.
fn path_within(path: &str, home: &str) -> bool {
    if home == "/" {
        return true;
    }
    path == home || path.starts_with(&format!("{}/", home))
}
