//! Route access rules.
//!
//! The policy is an ordered list of (patterns, requirement) rules and the
//! first rule with a matching pattern decides. Several rules overlap on
//! purpose: `/jobs/create` is also a `/jobs/{id}` and a `/jobs/**` path, so
//! recruiter-only rules must come before the public and catch-all ones.

use serde::Serialize;

use super::Principal;
use crate::db::UserRole;

/// Path matcher, segment aware. Paths are compared after trailing slash
/// removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    /// Exactly this path
    Exact(&'static str),
    /// This path or anything below it (`/jobs/update/**`)
    Prefix(&'static str),
    /// This path plus exactly one non-empty segment (`/jobs/{id}`)
    Param(&'static str),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match *self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(prefix) => match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
            PathPattern::Param(base) => match path.strip_prefix(base) {
                Some(rest) => rest
                    .strip_prefix('/')
                    .is_some_and(|segment| !segment.is_empty() && !segment.contains('/')),
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    /// Authenticated with one of these roles
    AnyRole(&'static [UserRole]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessDenied {
    /// No principal where one is needed
    Unauthenticated,
    /// Principal present but its role is not allowed
    Forbidden,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub patterns: &'static [PathPattern],
    pub requirement: Requirement,
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<Rule>,
    fallback: Requirement,
}

use PathPattern::{Exact, Param, Prefix};

const PUBLIC_PREFIXES: &[PathPattern] = &[
    Prefix("/auth"),
    Prefix("/docs"),
    Prefix("/api-docs"),
    Prefix("/ws"),
];

const ADMIN_PATHS: &[PathPattern] = &[Prefix("/admin"), Prefix("/users")];

const RECRUITER_JOB_PATHS: &[PathPattern] = &[
    Exact("/jobs/create"),
    Prefix("/jobs/update"),
    Prefix("/jobs/delete"),
    Exact("/jobs/my-jobs"),
    Prefix("/jobs/toggle-status"),
];

const RECRUITER_APPLICATION_PATHS: &[PathPattern] = &[
    Prefix("/applications/job"),
    Prefix("/applications/update-status"),
    Prefix("/applications/stats"),
];

const SEEKER_APPLICATION_PATHS: &[PathPattern] = &[
    Prefix("/applications/apply"),
    Exact("/applications/my-applications"),
    Prefix("/applications/withdraw"),
];

const PUBLIC_JOB_VIEWS: &[PathPattern] = &[
    Exact("/jobs/all"),
    Exact("/jobs/search"),
    Exact("/jobs/filter"),
    Exact("/jobs/recent"),
    Param("/jobs"),
];

const NOTIFICATION_PATHS: &[PathPattern] = &[Prefix("/notifications")];

const BOARD_PATHS: &[PathPattern] = &[Prefix("/jobs"), Prefix("/applications")];

impl AccessPolicy {
    /// Start an empty policy; unmatched paths get `fallback`
    pub fn new(fallback: Requirement) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn rule(mut self, patterns: &'static [PathPattern], requirement: Requirement) -> Self {
        self.rules.push(Rule {
            patterns,
            requirement,
        });
        self
    }

    /// The job board's route table
    pub fn standard() -> Self {
        Self::new(Requirement::Authenticated)
            .rule(PUBLIC_PREFIXES, Requirement::Public)
            .rule(ADMIN_PATHS, Requirement::AnyRole(&[UserRole::Admin]))
            .rule(RECRUITER_JOB_PATHS, Requirement::AnyRole(&[UserRole::Recruiter]))
            .rule(
                RECRUITER_APPLICATION_PATHS,
                Requirement::AnyRole(&[UserRole::Recruiter]),
            )
            .rule(
                SEEKER_APPLICATION_PATHS,
                Requirement::AnyRole(&[UserRole::JobSeeker]),
            )
            .rule(PUBLIC_JOB_VIEWS, Requirement::Public)
            .rule(NOTIFICATION_PATHS, Requirement::Authenticated)
            .rule(BOARD_PATHS, Requirement::Authenticated)
    }

    pub fn requirement_for(&self, path: &str) -> Requirement {
        let path = normalize(path);
        self.rules
            .iter()
            .find(|rule| rule.patterns.iter().any(|p| p.matches(path)))
            .map(|rule| rule.requirement)
            .unwrap_or(self.fallback)
    }

    pub fn evaluate(&self, path: &str, principal: Option<&Principal>) -> Result<(), AccessDenied> {
        match (self.requirement_for(path), principal) {
            (Requirement::Public, _) => Ok(()),
            (_, None) => Err(AccessDenied::Unauthenticated),
            (Requirement::Authenticated, Some(_)) => Ok(()),
            (Requirement::AnyRole(roles), Some(principal)) => {
                if roles.contains(&principal.role) {
                    Ok(())
                } else {
                    Err(AccessDenied::Forbidden)
                }
            }
        }
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: UserRole) -> Principal {
        Principal {
            user_id: "u".into(),
            email: "u@example.com".into(),
            role,
        }
    }

    #[test]
    fn test_pattern_matching() {
        assert!(Prefix("/auth").matches("/auth"));
        assert!(Prefix("/auth").matches("/auth/login"));
        assert!(!Prefix("/auth").matches("/authors"));

        assert!(Param("/jobs").matches("/jobs/42"));
        assert!(!Param("/jobs").matches("/jobs"));
        assert!(!Param("/jobs").matches("/jobs/"));
        assert!(!Param("/jobs").matches("/jobs/update/42"));

        assert!(Exact("/jobs/all").matches("/jobs/all"));
        assert!(!Exact("/jobs/all").matches("/jobs/all/x"));
    }

    #[test]
    fn test_create_job_precedence() {
        let policy = AccessPolicy::standard();
        assert_eq!(
            policy.evaluate("/jobs/create", Some(&principal(UserRole::JobSeeker))),
            Err(AccessDenied::Forbidden)
        );
        assert_eq!(
            policy.evaluate("/jobs/create", None),
            Err(AccessDenied::Unauthenticated)
        );
        assert_eq!(
            policy.evaluate("/jobs/create", Some(&principal(UserRole::Recruiter))),
            Ok(())
        );
    }

    #[test]
    fn test_public_job_views() {
        let policy = AccessPolicy::standard();
        for path in ["/jobs/all", "/jobs/search", "/jobs/filter", "/jobs/recent", "/jobs/abc-123"] {
            assert_eq!(policy.evaluate(path, None), Ok(()), "{path}");
        }
    }

    #[test]
    fn test_recruiter_rules_win_over_detail_wildcard() {
        let policy = AccessPolicy::standard();
        // Both look like /jobs/{id}
        assert_eq!(
            policy.requirement_for("/jobs/my-jobs"),
            Requirement::AnyRole(&[UserRole::Recruiter])
        );
        assert_eq!(
            policy.requirement_for("/jobs/create"),
            Requirement::AnyRole(&[UserRole::Recruiter])
        );
        assert_eq!(
            policy.requirement_for("/jobs/toggle-status/7"),
            Requirement::AnyRole(&[UserRole::Recruiter])
        );
    }

    #[test]
    fn test_application_role_split() {
        let policy = AccessPolicy::standard();
        let seeker = principal(UserRole::JobSeeker);
        let recruiter = principal(UserRole::Recruiter);

        assert_eq!(policy.evaluate("/applications/apply/j1", Some(&seeker)), Ok(()));
        assert_eq!(
            policy.evaluate("/applications/apply/j1", Some(&recruiter)),
            Err(AccessDenied::Forbidden)
        );
        assert_eq!(
            policy.evaluate("/applications/stats/j1", Some(&seeker)),
            Err(AccessDenied::Forbidden)
        );
        assert_eq!(policy.evaluate("/applications/job/j1", Some(&recruiter)), Ok(()));
        // Single application lookup is for either side
        assert_eq!(policy.evaluate("/applications/a1", Some(&seeker)), Ok(()));
        assert_eq!(policy.evaluate("/applications/a1", Some(&recruiter)), Ok(()));
        assert_eq!(
            policy.evaluate("/applications/a1", None),
            Err(AccessDenied::Unauthenticated)
        );
    }

    #[test]
    fn test_admin_paths() {
        let policy = AccessPolicy::standard();
        assert_eq!(policy.evaluate("/users", Some(&principal(UserRole::Admin))), Ok(()));
        assert_eq!(
            policy.evaluate("/users/role/RECRUITER", Some(&principal(UserRole::Recruiter))),
            Err(AccessDenied::Forbidden)
        );
        assert_eq!(
            policy.evaluate("/admin/stats", None),
            Err(AccessDenied::Unauthenticated)
        );
    }

    #[test]
    fn test_notifications_and_fallback_need_any_principal() {
        let policy = AccessPolicy::standard();
        for role in UserRole::ALL {
            assert_eq!(
                policy.evaluate("/notifications/unread-count", Some(&principal(role))),
                Ok(())
            );
        }
        assert_eq!(
            policy.evaluate("/notifications/unread-count", None),
            Err(AccessDenied::Unauthenticated)
        );
        assert_eq!(
            policy.evaluate("/something/else", None),
            Err(AccessDenied::Unauthenticated)
        );
        assert_eq!(policy.requirement_for("/jobs/1/extra"), Requirement::Authenticated);
    }

    #[test]
    fn test_public_prefixes_and_trailing_slash() {
        let policy = AccessPolicy::standard();
        assert_eq!(policy.evaluate("/auth/login", None), Ok(()));
        assert_eq!(policy.evaluate("/auth/me", None), Ok(()));
        assert_eq!(policy.evaluate("/jobs/all/", None), Ok(()));
        assert_eq!(
            policy.evaluate("/jobs/create/", Some(&principal(UserRole::Admin))),
            Err(AccessDenied::Forbidden)
        );
    }

    #[test]
    fn test_ordering_is_load_bearing() {
        // Same rules with the catch-all first lets seekers through
        let naive = AccessPolicy::new(Requirement::Authenticated)
            .rule(BOARD_PATHS, Requirement::Authenticated)
            .rule(RECRUITER_JOB_PATHS, Requirement::AnyRole(&[UserRole::Recruiter]));
        assert_eq!(
            naive.evaluate("/jobs/create", Some(&principal(UserRole::JobSeeker))),
            Ok(())
        );
        assert_eq!(
            AccessPolicy::standard()
                .evaluate("/jobs/create", Some(&principal(UserRole::JobSeeker))),
            Err(AccessDenied::Forbidden)
        );
    }
}
