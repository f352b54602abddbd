//! Route definitions for the `/servicebook` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::servicebook;
use crate::state::AppState;

/// Routes mounted at `/servicebook`.
///
/// ```text
/// GET    /services                    -> list_services
/// POST   /services                    -> create_service
/// GET    /services/defaults           -> service_defaults (?date=)
/// GET    /services/{id}               -> get_service
/// PUT    /services/{id}               -> update_service
/// DELETE /services/{id}               -> delete_service
/// GET    /services/{id}/attendance    -> list_attendance
/// PUT    /services/{id}/attendance    -> replace_attendance
/// POST   /services/{id}/attendance    -> set_attendance
///
/// PUT    /attendance/{id}             -> update_attendance
/// DELETE /attendance/{id}             -> delete_attendance
///
/// GET    /members/{id}                -> member_attendance
/// GET    /members/{id}/alert          -> attendance_alert
///
/// GET    /statistics/top              -> top_members (?state=&limit=)
/// GET    /statistics/series           -> attendance_over_time (?from=&to=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/services",
            get(servicebook::list_services).post(servicebook::create_service),
        )
        .route("/services/defaults", get(servicebook::service_defaults))
        .route(
            "/services/{id}",
            get(servicebook::get_service)
                .put(servicebook::update_service)
                .delete(servicebook::delete_service),
        )
        .route(
            "/services/{id}/attendance",
            get(servicebook::list_attendance)
                .put(servicebook::replace_attendance)
                .post(servicebook::set_attendance),
        )
        .route(
            "/attendance/{id}",
            put(servicebook::update_attendance).delete(servicebook::delete_attendance),
        )
        .route("/members/{id}", get(servicebook::member_attendance))
        .route("/members/{id}/alert", get(servicebook::attendance_alert))
        .route("/statistics/top", get(servicebook::top_members))
        .route("/statistics/series", get(servicebook::attendance_over_time))
}
