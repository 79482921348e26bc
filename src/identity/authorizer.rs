use std::collections::BTreeSet;

use super::principal::Identity;
use super::role::Role;

/// Set of roles any one of which grants access. Empty means "signed in is enough".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredRoles(BTreeSet<Role>);

impl RequiredRoles {
    pub fn any() -> Self { Self::default() }

    pub fn of<I: IntoIterator<Item = Role>>(roles: I) -> Self { roles.into_iter().collect() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn contains(&self, role: Role) -> bool { self.0.contains(&role) }

    /// The least demanding role listed.
    pub fn weakest(&self) -> Option<Role> { self.0.iter().copied().min() }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ { self.0.iter().copied() }
}

impl FromIterator<Role> for RequiredRoles {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self { Self(iter.into_iter().collect()) }
}

impl From<Role> for RequiredRoles {
    fn from(role: Role) -> Self { Self::of([role]) }
}

/// Does `identity` satisfy `required`?
///
/// Super admins always pass. Otherwise an exact listing passes, and so does
/// any role ranked at or above the weakest listed role: listing a low role
/// opens the region to every role above it. An empty set grants nobody but
/// super admins here; callers that mean "authenticated is enough" skip the
/// check when the set is empty (as `RouteGuard` does).
pub fn has_permission(identity: Option<&Identity>, required: &RequiredRoles) -> bool {
    let Some(identity) = identity else { return false };
    let role = identity.role;
    if role == Role::SuperAdmin {
        return true;
    }
    if required.contains(role) {
        return true;
    }
    match required.weakest() {
        Some(floor) => !floor.outranks(role),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::provider::DemoCredentials;

    fn with_role(role: Role) -> Identity {
        let mut ident = DemoCredentials::new().lookup("analyst").unwrap().identity.clone();
        ident.role = role;
        ident
    }

    fn all_subsets() -> Vec<RequiredRoles> {
        (0u8..16)
            .map(|mask| Role::ALL.into_iter().enumerate().filter(|(i, _)| mask & (1 << i) != 0).map(|(_, r)| r).collect())
            .collect()
    }

    #[test]
    fn absent_identity_is_never_permitted() {
        for req in all_subsets() {
            assert!(!has_permission(None, &req));
        }
    }

    #[test]
    fn super_admin_passes_every_set() {
        let admin = with_role(Role::SuperAdmin);
        for req in all_subsets() {
            assert!(has_permission(Some(&admin), &req), "{req:?}");
        }
    }

    #[test]
    fn rank_dominance_over_weakest_listed_role() {
        let sec = with_role(Role::SecurityAdmin);
        let ops = with_role(Role::NetworkOperator);
        assert!(has_permission(Some(&sec), &Role::NetworkOperator.into()));
        assert!(!has_permission(Some(&ops), &Role::SecurityAdmin.into()));
        // a low listed role widens access to everyone above it
        let mixed = RequiredRoles::of([Role::SuperAdmin, Role::SecurityAnalyst]);
        assert!(has_permission(Some(&ops), &mixed));
        assert!(!has_permission(Some(&ops), &RequiredRoles::of([Role::SuperAdmin])));
    }

    #[test]
    fn monotone_in_rank() {
        for req in all_subsets() {
            for low in Role::ALL {
                for high in Role::ALL.into_iter().filter(|h| h.outranks(low)) {
                    if has_permission(Some(&with_role(low)), &req) {
                        assert!(has_permission(Some(&with_role(high)), &req), "{high:?} should pass {req:?} like {low:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn empty_set_grants_only_super_admin() {
        let empty = RequiredRoles::any();
        assert!(empty.is_empty());
        assert!(has_permission(Some(&with_role(Role::SuperAdmin)), &empty));
        assert!(!has_permission(Some(&with_role(Role::SecurityAdmin)), &empty));
    }

    #[test]
    fn weakest_is_lowest_rank() {
        assert_eq!(RequiredRoles::of([Role::SecurityAdmin, Role::NetworkOperator]).weakest(), Some(Role::NetworkOperator));
        assert_eq!(RequiredRoles::any().weakest(), None);
    }
}
