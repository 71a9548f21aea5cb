use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::core_auth::AuthError;
use crate::users::User;

/// The credential store. Built once from the validated configuration and
/// immutable for the process lifetime.
pub struct Authenticator {
    users: HashMap<String, Arc<User>>,
}

impl Authenticator {
    pub fn new(users: &HashMap<String, User>) -> Self {
        let users = users
            .iter()
            .map(|(name, user)| (name.clone(), Arc::new(user.clone())))
            .collect();
        Self { users }
    }

    /// Verifies credentials. The password comparison is constant-time to
    /// avoid a timing oracle on the control channel.
    pub fn authenticate(&self, name: &str, password: &str) -> Result<Arc<User>, AuthError> {
        let user = self
            .users
            .get(name)
            .ok_or_else(|| AuthError::UnknownUser(name.to_string()))?;

        let matches: bool = user
            .pass
            .as_bytes()
            .ct_eq(password.as_bytes())
            .into();
        if !matches {
            return Err(AuthError::BadPassword(name.to_string()));
        }

        Ok(Arc::clone(user))
    }

    /// Looks a user up by name without checking credentials. Used by the
    /// TFTP default-identity policy.
    pub fn lookup(&self, name: &str) -> Option<Arc<User>> {
        self.users.get(name).cloned()
    }

    /// All configured usernames in sorted order.
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.users.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::parse_user_spec;

    fn store() -> Authenticator {
        let users = parse_user_spec("admin:secret:1000:/:rw,guest:gp:1001:/public:ro").unwrap();
        Authenticator::new(&users)
    }

    #[test]
    fn accepts_valid_credentials() {
        let auth = store();
        let user = auth.authenticate("admin", "secret").unwrap();
        assert_eq!(user.name, "admin");
        assert!(user.can_write());
    }

    #[test]
    fn rejects_wrong_password() {
        let auth = store();
        assert!(matches!(
            auth.authenticate("admin", "wrong"),
            Err(AuthError::BadPassword(_))
        ));
    }

    #[test]
    fn rejects_unknown_user() {
        let auth = store();
        assert!(matches!(
            auth.authenticate("root", "secret"),
            Err(AuthError::UnknownUser(_))
        ));
    }

    #[test]
    fn lookup_skips_password_check() {
        let auth = store();
        assert_eq!(auth.lookup("guest").unwrap().home(), "/public");
        assert!(auth.lookup("root").is_none());
    }

    #[test]
    fn usernames_are_sorted() {
        let auth = store();
        assert_eq!(auth.usernames(), vec!["admin", "guest"]);
    }
}
