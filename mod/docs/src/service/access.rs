//! Access-level gating for document reads.
//!
//! This is a hand-coded visibility hierarchy, deliberately separate from
//! the role/permission table: public < members < committee < executives
//! < admin. Mutations still go through the permission table.

use acpn_core::UserRole;

use crate::model::AccessLevel;

/// Whether a role may read documents at the given access level.
pub fn has_document_access(role: UserRole, level: AccessLevel) -> bool {
    match level {
        // Every authenticated role reads public and member documents.
        AccessLevel::Public | AccessLevel::Members => true,
        AccessLevel::Committee => matches!(
            role,
            UserRole::Secretary
                | UserRole::Treasurer
                | UserRole::FinancialSecretary
                | UserRole::Admin
                | UserRole::Superadmin
        ),
        AccessLevel::Executives => matches!(
            role,
            UserRole::Treasurer
                | UserRole::FinancialSecretary
                | UserRole::Admin
                | UserRole::Superadmin
        ),
        AccessLevel::Admin => matches!(role, UserRole::Admin | UserRole::Superadmin),
    }
}

/// Every access level readable by a role, in hierarchy order.
pub fn allowed_levels(role: UserRole) -> Vec<AccessLevel> {
    AccessLevel::ALL
        .into_iter()
        .filter(|&level| has_document_access(role, level))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_stops_at_members_level() {
        assert!(has_document_access(UserRole::Member, AccessLevel::Public));
        assert!(has_document_access(UserRole::Member, AccessLevel::Members));
        assert!(!has_document_access(UserRole::Member, AccessLevel::Committee));
        assert!(!has_document_access(UserRole::Member, AccessLevel::Executives));
        assert!(!has_document_access(UserRole::Member, AccessLevel::Admin));
    }

    #[test]
    fn secretary_reaches_committee_but_not_executives() {
        assert!(has_document_access(UserRole::Secretary, AccessLevel::Committee));
        assert!(!has_document_access(UserRole::Secretary, AccessLevel::Executives));
        assert!(!has_document_access(UserRole::Secretary, AccessLevel::Admin));
    }

    #[test]
    fn finance_officers_reach_executives() {
        for role in [UserRole::Treasurer, UserRole::FinancialSecretary] {
            assert!(has_document_access(role, AccessLevel::Executives));
            assert!(!has_document_access(role, AccessLevel::Admin));
        }
    }

    #[test]
    fn admins_read_everything() {
        for role in [UserRole::Admin, UserRole::Superadmin] {
            for level in AccessLevel::ALL {
                assert!(has_document_access(role, level));
            }
        }
    }

    #[test]
    fn allowed_levels_are_cumulative() {
        assert_eq!(allowed_levels(UserRole::Member).len(), 2);
        assert_eq!(allowed_levels(UserRole::Secretary).len(), 3);
        assert_eq!(allowed_levels(UserRole::Treasurer).len(), 4);
        assert_eq!(allowed_levels(UserRole::Superadmin).len(), 5);
    }
}
