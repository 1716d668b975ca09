//! Navigation guard driven by a real session store.

use std::sync::Arc;

use clinic_sync_core::db::MemoryStore;
use clinic_sync_core::guard::{Navigation, NavigationGuard};
use clinic_sync_core::models::Credentials;
use clinic_sync_core::routes::{self, RouteRequirement};
use clinic_sync_core::store::SessionStore;
use clinic_sync_core::transport::fake::FakeTransport;

fn session() -> Arc<SessionStore> {
    Arc::new(SessionStore::new(
        Arc::new(FakeTransport::new()),
        Arc::new(MemoryStore::new()),
    ))
}

#[test]
fn test_guest_redirected_from_protected_routes() {
    let guard = NavigationGuard::new(session());

    for path in ["/", "/patients", "/patients/12/edit", "/appointments/add", "/reports"] {
        assert_eq!(guard.navigate(path), Navigation::Redirect("/login"), "{path}");
    }
    assert_eq!(guard.navigate("/login"), Navigation::Allow);
}

#[tokio::test]
async fn test_signed_in_user_redirected_from_login() {
    let session = session();
    let guard = NavigationGuard::new(session.clone());

    session.login(&Credentials::new("admin", "admin123")).await.unwrap();

    assert_eq!(guard.navigate("/login"), Navigation::Redirect("/"));
    assert_eq!(guard.navigate("/patients/3/edit"), Navigation::Allow);

    session.logout();
    assert_eq!(guard.navigate("/patients/3/edit"), Navigation::Redirect("/login"));
}

#[test]
fn test_unknown_path_allowed_for_guest() {
    let guard = NavigationGuard::new(session());

    assert_eq!(guard.navigate("/patients/3"), Navigation::Allow);
    assert_eq!(guard.navigate("/about"), Navigation::Allow);
}

#[test]
fn test_every_route_is_guarded_or_guest_only() {
    for route in routes::ROUTES.iter() {
        let expected = if route.path == "/login" {
            RouteRequirement::RequiresGuest
        } else {
            RouteRequirement::RequiresAuth
        };
        assert_eq!(route.requirement, expected, "{}", route.name);
    }
}
