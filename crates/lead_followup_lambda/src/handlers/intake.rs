use lead_followup_core::contract::{IntakeAcceptedResponse, RESPONSE_SCHEMA_VERSION};
use lead_followup_core::lead::Lead;
use lead_followup_core::submission::{detect_body_format, parse_submission};
use serde_json::Value;

use crate::adapters::lead_store::LeadStore;
use crate::handlers::http::{
    error_response, parse_http_event, validation_error_response, ApiGatewayResponse,
};

/// Records a lead submission. The contact address is the store key, so a
/// repeat submission replaces the earlier record wholesale.
pub async fn handle_intake_event(
    event: Value,
    store: &dyn LeadStore,
    now_ms: i64,
) -> ApiGatewayResponse {
    let request = match parse_http_event(&event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    if request.method != "POST" {
        return error_response(405, "method_not_allowed", "Method not allowed");
    }

    let format = detect_body_format(request.header("content-type"), &request.body);
    let submission = match parse_submission(&request.body, format) {
        Ok(value) => value,
        Err(error) => {
            tracing::info!(
                component = "intake_handler",
                event = "submission_rejected",
                reason = error.message(),
                detail = error.detail().unwrap_or_default(),
            );
            return validation_error_response(error.message());
        }
    };

    let lead = Lead::new_submission(submission.email.clone(), submission.name, now_ms);
    if let Err(error) = store.put(&submission.email, &lead).await {
        tracing::error!(
            component = "intake_handler",
            event = "lead_store_failed",
            error = %error,
        );
        return error_response(500, "store_unavailable", "Lead intake error");
    }

    tracing::info!(
        component = "intake_handler",
        event = "lead_stored",
        submitted_at = now_ms,
    );
    ApiGatewayResponse::json(
        200,
        &IntakeAcceptedResponse {
            status: "stored".to_string(),
            schema_version: RESPONSE_SCHEMA_VERSION.to_string(),
        },
    )
}
