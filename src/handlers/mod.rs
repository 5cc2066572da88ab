pub mod health_handler;
pub mod quiz_handler;

use actix_web::web;

pub use health_handler::{health_check, index, not_found};
pub use quiz_handler::solve_quiz;

/// Registers every route plus the JSON 404 fallback.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(solve_quiz)
        .service(health_check)
        .service(index)
        .default_service(web::to(not_found));
}
