//! crates/burner_core/src/routes.rs
//!
//! Application routes, the dashboard navigation table and the
//! authentication guard.

use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    OAuthCallback,
    Dashboard,
    Editor,
    Projects,
    Library,
    Settings,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Landing,
        Route::Login,
        Route::OAuthCallback,
        Route::Dashboard,
        Route::Editor,
        Route::Projects,
        Route::Library,
        Route::Settings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Login => "/login",
            Route::OAuthCallback => "/oauth/callback",
            Route::Dashboard => "/dashboard",
            Route::Editor => "/editor",
            Route::Projects => "/projects",
            Route::Library => "/library",
            Route::Settings => "/settings",
        }
    }

    /// Matches a path, ignoring any query string and a trailing slash.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        Route::ALL.into_iter().find(|r| r.path() == trimmed)
    }

    /// Dashboard pages need a logged-in user.
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::Dashboard | Route::Editor | Route::Projects | Route::Library | Route::Settings
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Render(Route),
    Redirect(Route),
    /// The session has not been hydrated; no decision can be made yet.
    AwaitHydration,
}

/// Decides what to show for `route` given the session.
pub fn guard(route: Route, session: &SessionState) -> RouteDecision {
    if !session.hydrated {
        return RouteDecision::AwaitHydration;
    }
    match route {
        Route::Login if session.authenticated => RouteDecision::Redirect(Route::Landing),
        r if r.requires_auth() && !session.authenticated => RouteDecision::Redirect(Route::Login),
        r => RouteDecision::Render(r),
    }
}

//=========================================================================================
// Dashboard Navigation
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationItem {
    pub id: &'static str,
    pub label: &'static str,
    pub route: Route,
    pub description: &'static str,
}

pub static NAVIGATION: [NavigationItem; 5] = [
    NavigationItem {
        id: "dashboard",
        label: "Dashboard",
        route: Route::Dashboard,
        description: "Overview and quick actions",
    },
    NavigationItem {
        id: "editor",
        label: "Video Editor",
        route: Route::Editor,
        description: "Edit your videos with subtitles",
    },
    NavigationItem {
        id: "projects",
        label: "Projects",
        route: Route::Projects,
        description: "Browse your video projects",
    },
    NavigationItem {
        id: "library",
        label: "Library",
        route: Route::Library,
        description: "Media library and assets",
    },
    NavigationItem {
        id: "settings",
        label: "Settings",
        route: Route::Settings,
        description: "Account and preferences",
    },
];

/// The sidebar entries, in display order.
pub fn navigation_items() -> &'static [NavigationItem] {
    &NAVIGATION
}

pub fn navigation_for_path(path: &str) -> Option<&'static NavigationItem> {
    let route = Route::from_path(path)?;
    navigation_items().iter().find(|item| item.route == route)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub title: &'static str,
    pub description: Option<&'static str>,
}

/// Header for a dashboard page; unknown paths get the dashboard title.
pub fn page_header(path: &str) -> PageHeader {
    match navigation_for_path(path) {
        Some(item) => PageHeader {
            title: item.label,
            description: Some(item.description),
        },
        None => PageHeader {
            title: "Dashboard",
            description: None,
        },
    }
}
