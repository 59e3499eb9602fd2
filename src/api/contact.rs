use crate::api::AppState;
use crate::api::schemas::contact::{ContactRequest, ContactResponse};
use crate::domain::submission::Submission;
use crate::error::{AppError, Result};
use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};

/// Accepts a contact-form submission.
///
/// The submission is recorded and relayed in the background; the client is answered with
/// `202 Accepted` before either happens and never learns whether the email was sent.
///
/// # Errors
/// Returns `AppError::Validation` if a field is missing, too short, or not a valid address.
pub async fn submit_contact(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ContactRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload?;
    request.validate().map_err(AppError::Validation)?;

    let submission = Submission::accept(request.name, request.email, request.message);
    tracing::info!(submission_id = %submission.id(), "Contact accepted");
    state.dispatcher.dispatch(submission);

    Ok((StatusCode::ACCEPTED, Json(ContactResponse::accepted())))
}
