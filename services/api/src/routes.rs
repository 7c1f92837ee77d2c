use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::handlers::{
    assignments, availability, certifications, evaluations, psms, registration, rewards, sessions,
    upload, users,
};
use crate::state::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Patients
        .route("/api/users", get(users::list_users).post(users::upsert_user))
        .route(
            "/api/users/:user_id/psm",
            get(users::get_current_psm).put(users::set_current_psm),
        )
        // PSMs
        .route("/api/psms", get(psms::list_psms).post(psms::register_psm))
        .route(
            "/api/psms/:psm_id",
            axum::routing::put(psms::update_psm).delete(psms::delete_psm),
        )
        // Assignment recommendations and process management
        .route(
            "/api/assignments",
            get(assignments::recommendations)
                .post(assignments::create_assignment)
                .patch(assignments::update_process),
        )
        // Sessions and availability
        .route(
            "/api/sessions",
            get(sessions::list_sessions)
                .post(sessions::create_session)
                .patch(sessions::update_session),
        )
        .route(
            "/api/sessions/availability",
            get(availability::day_availability).post(availability::bulk_availability),
        )
        // Certifications
        .route(
            "/api/certifications",
            get(certifications::list_certifications)
                .post(certifications::submit_certification)
                .patch(certifications::update_certification)
                .put(certifications::record_payment),
        )
        // Evaluations
        .route(
            "/api/evaluations",
            get(evaluations::list_evaluations)
                .post(evaluations::create_evaluation)
                .put(evaluations::psm_rating_summary),
        )
        // Rewards ledger
        .route("/api/rewards", get(rewards::list_rewards))
        // Dual-write registration
        .route("/api/registration", post(registration::complete_registration))
        .route(
            "/api/registration/chain",
            post(registration::retry_chain_registration),
        )
        // Certification document upload
        .route(
            "/api/upload",
            post(upload::upload_document)
                .delete(upload::delete_document)
                .get(upload::file_metadata),
        )
        // Certification documents top out at 5 MB; leave headroom for
        // the multipart framing.
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
}
