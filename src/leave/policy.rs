//! Capability checks for leave requests.
//!
//! The engine only decides *which* action to ask about; what a role may do
//! lives in [`scope_for`], a plain table that can be tested on its own.

use crate::model::{employee::Employee, leave_request::LeaveStatus, role::Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Action {
    Create,
    Read,
    Update,
    Approve,
    Reject,
}

/// How far a granted action reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Department,
    Own,
}

/// Who is asking.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub id: u64,
    pub role: Role,
    pub department: Option<String>,
}

impl From<&Employee> for ActorContext {
    fn from(e: &Employee) -> Self {
        Self {
            id: e.id,
            role: e.role,
            department: e.department.clone(),
        }
    }
}

/// Attributes of the request (or attachment) being acted on.
#[derive(Debug, Clone)]
pub struct Subject {
    pub owner_id: u64,
    pub department: Option<String>,
}

impl From<&Employee> for Subject {
    fn from(owner: &Employee) -> Self {
        Self {
            owner_id: owner.id,
            department: owner.department.clone(),
        }
    }
}

/// Visibility applied to list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListScope {
    pub scope: Scope,
    /// When set, only requests in this status are visible.
    pub status: Option<LeaveStatus>,
}

pub fn scope_for(role: Role, action: Action) -> Option<Scope> {
    use Action::*;

    match role {
        Role::Admin => Some(Scope::All),
        Role::Hr => match action {
            Read => Some(Scope::All),
            Create => Some(Scope::Own),
            Update | Approve | Reject => None,
        },
        Role::DepartmentLead => match action {
            Read | Approve | Reject => Some(Scope::Department),
            Create | Update => Some(Scope::Own),
        },
        Role::Employee => match action {
            Create | Read | Update => Some(Scope::Own),
            Approve | Reject => None,
        },
    }
}

pub trait AccessPolicy: Send + Sync {
    fn can_perform(&self, actor: &ActorContext, action: Action, subject: &Subject) -> bool;

    /// Which requests `actor` may list, or `None` for none at all.
    fn list_scope(&self, actor: &ActorContext) -> Option<ListScope>;

    /// Whether `actor` may rebuild other employees' ledgers.
    fn can_manage_ledger(&self, actor: &ActorContext) -> bool;
}

/// Role table backed policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct RolePolicy;

impl AccessPolicy for RolePolicy {
    fn can_perform(&self, actor: &ActorContext, action: Action, subject: &Subject) -> bool {
        match scope_for(actor.role, action) {
            Some(Scope::All) => true,
            Some(Scope::Department) => {
                actor.department.is_some() && actor.department == subject.department
            }
            Some(Scope::Own) => actor.id == subject.owner_id,
            None => false,
        }
    }

    fn list_scope(&self, actor: &ActorContext) -> Option<ListScope> {
        let scope = scope_for(actor.role, Action::Read)?;
        // HR reviews the outcome of approvals, not the queue
        let status = (actor.role == Role::Hr).then_some(LeaveStatus::Approved);
        Some(ListScope { scope, status })
    }

    fn can_manage_ledger(&self, actor: &ActorContext) -> bool {
        matches!(actor.role, Role::Admin | Role::Hr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: u64, role: Role, dept: Option<&str>) -> ActorContext {
        ActorContext {
            id,
            role,
            department: dept.map(str::to_string),
        }
    }

    fn subject(owner_id: u64, dept: Option<&str>) -> Subject {
        Subject {
            owner_id,
            department: dept.map(str::to_string),
        }
    }

    #[test]
    fn admin_reaches_everything() {
        let admin = actor(1, Role::Admin, None);
        for action in [Action::Create, Action::Read, Action::Update, Action::Approve, Action::Reject] {
            assert!(RolePolicy.can_perform(&admin, action, &subject(99, Some("Sales"))));
        }
    }

    #[test]
    fn lead_is_scoped_to_department() {
        let lead = actor(2, Role::DepartmentLead, Some("Engineering"));
        assert!(RolePolicy.can_perform(&lead, Action::Approve, &subject(5, Some("Engineering"))));
        assert!(!RolePolicy.can_perform(&lead, Action::Approve, &subject(5, Some("Sales"))));
        assert!(!RolePolicy.can_perform(&lead, Action::Reject, &subject(5, None)));
    }

    #[test]
    fn lead_without_department_approves_nothing() {
        let lead = actor(2, Role::DepartmentLead, None);
        assert!(!RolePolicy.can_perform(&lead, Action::Approve, &subject(5, None)));
    }

    #[test]
    fn employees_only_touch_their_own_requests() {
        let emp = actor(7, Role::Employee, Some("Engineering"));
        assert!(RolePolicy.can_perform(&emp, Action::Read, &subject(7, Some("Engineering"))));
        assert!(!RolePolicy.can_perform(&emp, Action::Read, &subject(8, Some("Engineering"))));
        assert!(!RolePolicy.can_perform(&emp, Action::Approve, &subject(7, Some("Engineering"))));
    }

    #[test]
    fn hr_reads_but_never_decides() {
        assert_eq!(scope_for(Role::Hr, Action::Read), Some(Scope::All));
        assert_eq!(scope_for(Role::Hr, Action::Approve), None);
        assert_eq!(scope_for(Role::Hr, Action::Reject), None);
    }

    #[test]
    fn list_scope_limits_hr_to_approved() {
        let hr = actor(3, Role::Hr, None);
        assert_eq!(
            RolePolicy.list_scope(&hr),
            Some(ListScope {
                scope: Scope::All,
                status: Some(LeaveStatus::Approved)
            })
        );
        let emp = actor(4, Role::Employee, None);
        assert_eq!(RolePolicy.list_scope(&emp).map(|s| s.scope), Some(Scope::Own));
    }

    #[test]
    fn only_hr_and_admin_manage_ledgers() {
        assert!(RolePolicy.can_manage_ledger(&actor(1, Role::Admin, None)));
        assert!(RolePolicy.can_manage_ledger(&actor(2, Role::Hr, Some("People"))));
        assert!(!RolePolicy.can_manage_ledger(&actor(3, Role::DepartmentLead, Some("People"))));
        assert!(!RolePolicy.can_manage_ledger(&actor(4, Role::Employee, None)));
    }
}
