//! Feature prefixes and the collaborators mounted under them.
//!
//! # Responsibilities
//! - Name the fixed set of feature prefixes
//! - Hold one collaborator `Router` per prefix
//! - Build the dispatcher that hands each request to its collaborator
//!
//! # Design Decisions
//! - Prefixes are a closed enum; the set never changes at runtime
//! - Prefixes are segment-disjoint, so mount order cannot change a match
//! - A prefix without a collaborator answers 501 instead of falling through
//!   to static files

use std::collections::HashMap;

use axum::Router;

use crate::handlers;

/// One feature area of the chat application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Session,
    Chat,
    Auth,
    History,
    Contact,
    Profile,
}

impl Feature {
    /// Mount order.
    pub const ALL: [Feature; 6] = [
        Feature::Session,
        Feature::Chat,
        Feature::Auth,
        Feature::History,
        Feature::Contact,
        Feature::Profile,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Feature::Session => "/session",
            Feature::Chat => "/chat",
            Feature::Auth => "/api/auth",
            Feature::History => "/api/history",
            Feature::Contact => "/api/contact",
            Feature::Profile => "/api/profile",
        }
    }

    /// The feature whose prefix owns `path`, matching whole segments only.
    pub fn for_path(path: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|feature| {
            path.strip_prefix(feature.prefix())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

/// Collaborator routers keyed by feature.
#[derive(Debug, Clone, Default)]
pub struct Collaborators {
    mounted: HashMap<Feature, Router>,
}

impl Collaborators {
    /// No collaborators: every feature prefix answers 501.
    pub fn none() -> Self {
        Self::default()
    }

    /// Collaborators shipped with the gateway.
    pub fn builtin() -> Self {
        Self::none().mount(Feature::Session, handlers::session::router())
    }

    /// Attach `router` under `feature`'s prefix, replacing any previous one.
    ///
    /// The router sees paths relative to the prefix.
    pub fn mount(mut self, feature: Feature, router: Router) -> Self {
        self.mounted.insert(feature, router);
        self
    }

    /// One router with every feature prefix nested, in mount order.
    pub fn into_dispatcher(mut self) -> Router {
        Feature::ALL.into_iter().fold(Router::new(), |router, feature| {
            let collaborator = self
                .mounted
                .remove(&feature)
                .unwrap_or_else(|| handlers::unattached::router(feature.prefix()));
            router.nest_service(feature.prefix(), collaborator)
        })
    }
}
