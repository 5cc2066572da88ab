use std::sync::Arc;

use actix_web::{post, web, HttpRequest, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    middleware::get_request_id,
    models::dto::{request::SolveQuizRequest, response::SolveQuizResponse},
};

/// Authenticates the caller, then runs the whole chain before responding.
#[post("/quiz")]
pub async fn solve_quiz(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let request_id = get_request_id(&req).unwrap_or_else(|| "-".to_string());
    let request = SolveQuizRequest::from_body(&body)?;

    if !state.config.credentials_match(&request.email, &request.secret) {
        log::warn!(
            "[{}] Rejected quiz request with invalid credentials for {}",
            request_id,
            request.email
        );
        return Err(AppError::Forbidden("Invalid credentials".to_string()));
    }

    log::info!("[{}] Received quiz request for {}", request_id, request.url);

    // A panic inside the chain surfaces as a JoinError instead of killing the worker.
    let controller = Arc::clone(&state.chain_controller);
    let url = request.url;
    let result = tokio::spawn(async move { controller.solve_quiz_chain(&url).await })
        .await
        .map_err(|e| {
            log::error!("[{}] Quiz chain task failed: {}", request_id, e);
            AppError::InternalError(e.to_string())
        })?;

    Ok(HttpResponse::Ok().json(SolveQuizResponse::completed(result)))
}
