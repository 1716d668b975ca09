//! Application route table.

use self::RouteRequirement::{RequiresAuth, RequiresGuest};

/// Login view.
pub const LOGIN_PATH: &str = "/login";

/// Dashboard, the landing view after login.
pub const HOME_PATH: &str = "/";

/// Session requirement declared by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteRequirement {
    /// Reachable by anyone.
    #[default]
    Public,
    /// Only with an authenticated session.
    RequiresAuth,
    /// Only without one (login).
    RequiresGuest,
}

/// A routed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Path pattern; `:name` segments match any single segment.
    pub path: &'static str,
    pub name: &'static str,
    pub requirement: RouteRequirement,
}

impl Route {
    pub const fn new(path: &'static str, name: &'static str, requirement: RouteRequirement) -> Self {
        Self {
            path,
            name,
            requirement,
        }
    }

    /// Whether `path` (query string and fragment ignored) matches this route.
    pub fn matches(&self, path: &str) -> bool {
        let pattern = segments(self.path);
        let actual = segments(strip_suffix(path));
        pattern.len() == actual.len()
            && pattern
                .iter()
                .zip(&actual)
                .all(|(p, a)| p.starts_with(':') || p == a)
    }

    /// Value of a `:name` segment in `path`.
    pub fn param<'a>(&self, path: &'a str, name: &str) -> Option<&'a str> {
        if !self.matches(path) {
            return None;
        }
        segments(self.path)
            .into_iter()
            .zip(segments(strip_suffix(path)))
            .find(|(p, _)| p.strip_prefix(':') == Some(name))
            .map(|(_, a)| a)
    }
}

/// Every view of the application.
pub static ROUTES: &[Route] = &[
    Route::new(LOGIN_PATH, "Login", RequiresGuest),
    Route::new(HOME_PATH, "Dashboard", RequiresAuth),
    Route::new("/patients", "PatientList", RequiresAuth),
    Route::new("/patients/add", "AddPatient", RequiresAuth),
    Route::new("/patients/:id/edit", "EditPatient", RequiresAuth),
    Route::new("/doctors", "DoctorList", RequiresAuth),
    Route::new("/doctors/add", "AddDoctor", RequiresAuth),
    Route::new("/doctors/:id/edit", "EditDoctor", RequiresAuth),
    Route::new("/appointments", "AppointmentList", RequiresAuth),
    Route::new("/appointments/add", "AddAppointment", RequiresAuth),
    Route::new("/appointments/:id/edit", "EditAppointment", RequiresAuth),
    Route::new("/medical-records", "MedicalRecords", RequiresAuth),
    Route::new("/patients/:id/prescription", "PrescriptionForm", RequiresAuth),
    Route::new("/reports", "Reports", RequiresAuth),
];

/// First route matching `path`.
pub fn resolve(path: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|route| route.matches(path))
}

/// Route by name.
pub fn by_name(name: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|route| route.name == name)
}

fn strip_suffix(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
