use crate::db::{self, DbUser};
use crate::domain::models::Role;
use crate::state::SharedState;
use crate::web::error::AppError;

/// Role memberships of a user, as read from the group tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roles {
    pub sales_manager: bool,
    pub client_rep: bool,
}

impl Roles {
    pub fn from_group_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut roles = Roles::default();
        for name in names {
            match Role::from_group_name(name.as_ref()) {
                Some(Role::SalesManager) => roles.sales_manager = true,
                Some(Role::ClientRep) => roles.client_rep = true,
                None => {}
            }
        }
        roles
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    SalesManager,
    ClientRep,
    Either,
}

impl Permission {
    pub fn allows(&self, roles: Roles) -> bool {
        match self {
            Permission::SalesManager => roles.sales_manager,
            Permission::ClientRep => roles.client_rep,
            Permission::Either => roles.sales_manager || roles.client_rep,
        }
    }
}

/// Loads the caller's roles fresh and fails with 403 when `perm` is not met.
pub async fn require(state: &SharedState, user: &DbUser, perm: Permission) -> Result<Roles, AppError> {
    let names = db::user_group_names(&state.pool, user.id).await?;
    let roles = Roles::from_group_names(&names);
    if !perm.allows(roles) {
        tracing::warn!("Permission {:?} denied for user {}", perm, user.id);
        return Err(AppError::Forbidden);
    }
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CLIENT_REP_GROUP, SALES_MANAGER_GROUP};

    #[test]
    fn test_roles_from_groups() {
        let roles = Roles::from_group_names(&[SALES_MANAGER_GROUP, "Something Else"]);
        assert!(roles.sales_manager);
        assert!(!roles.client_rep);

        let both = Roles::from_group_names(&[CLIENT_REP_GROUP, SALES_MANAGER_GROUP]);
        assert!(both.sales_manager && both.client_rep);

        assert_eq!(Roles::from_group_names::<&str>(&[]), Roles::default());
    }

    #[test]
    fn test_permission_predicates() {
        let manager = Roles { sales_manager: true, client_rep: false };
        let rep = Roles { sales_manager: false, client_rep: true };
        let nobody = Roles::default();

        assert!(Permission::SalesManager.allows(manager));
        assert!(!Permission::SalesManager.allows(rep));
        assert!(Permission::ClientRep.allows(rep));
        assert!(!Permission::ClientRep.allows(manager));
        assert!(Permission::Either.allows(manager));
        assert!(Permission::Either.allows(rep));
        assert!(!Permission::Either.allows(nobody));
    }
}
