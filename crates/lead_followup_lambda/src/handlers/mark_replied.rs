use lead_followup_core::contract::MarkRepliedResponse;
use serde_json::Value;

use crate::adapters::lead_store::{ConditionalPut, LeadStore, StoreError, StoredLead};
use crate::handlers::http::{
    error_response, parse_http_event, validation_error_response, ApiGatewayResponse,
};

/// Flags a lead as personally answered so the sweep stops considering it.
pub async fn handle_mark_replied_event(event: Value, store: &dyn LeadStore) -> ApiGatewayResponse {
    let request = match parse_http_event(&event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    let Some(lead_id) = request
        .query_param("lead_id")
        .or_else(|| request.query_param("id"))
        .map(|value| value.trim().to_string())
    else {
        return validation_error_response("Missing lead_id");
    };

    let result = if store.supports_conditional_writes() {
        mark_with_version_check(store, &lead_id).await
    } else {
        mark_last_write_wins(store, &lead_id).await
    };
    if let Err(response) = result {
        return response;
    }

    tracing::info!(component = "mark_replied_handler", event = "lead_marked_replied");
    ApiGatewayResponse::json(200, &MarkRepliedResponse { ok: true, lead_id })
}

/// Read-modify-write attempts before giving up on a lead that keeps changing.
const MAX_MARK_ATTEMPTS: usize = 3;

async fn read_lead(
    store: &dyn LeadStore,
    lead_id: &str,
) -> Result<StoredLead, ApiGatewayResponse> {
    match store.get(lead_id).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(error_response(404, "not_found", "Lead not found")),
        Err(error) => {
            tracing::error!(
                component = "mark_replied_handler",
                event = "lead_read_failed",
                error = %error,
            );
            Err(error_response(500, "store_unavailable", "Mark replied error"))
        }
    }
}

fn write_failed(error: StoreError) -> ApiGatewayResponse {
    tracing::error!(
        component = "mark_replied_handler",
        event = "lead_write_failed",
        error = %error,
    );
    error_response(500, "store_unavailable", "Mark replied error")
}

async fn mark_last_write_wins(
    store: &dyn LeadStore,
    lead_id: &str,
) -> Result<(), ApiGatewayResponse> {
    let mut lead = read_lead(store, lead_id).await?.lead;
    if lead.manual_reply_sent() {
        return Ok(());
    }
    lead.mark_manual_reply_sent();
    store.put(lead_id, &lead).await.map_err(write_failed)
}

/// Writes only over the version that was read, so a follow-up committed by a
/// concurrent sweep is re-read instead of overwritten.
async fn mark_with_version_check(
    store: &dyn LeadStore,
    lead_id: &str,
) -> Result<(), ApiGatewayResponse> {
    for attempt in 1..=MAX_MARK_ATTEMPTS {
        let stored = read_lead(store, lead_id).await?;
        let mut lead = stored.lead;
        if lead.manual_reply_sent() {
            return Ok(());
        }
        lead.mark_manual_reply_sent();
        match store
            .put_if_version(lead_id, &lead, &stored.version)
            .await
            .map_err(write_failed)?
        {
            ConditionalPut::Written(_) => return Ok(()),
            ConditionalPut::Conflict => {
                tracing::info!(
                    component = "mark_replied_handler",
                    event = "lead_changed_during_mark",
                    attempt,
                );
            }
        }
    }

    tracing::warn!(
        component = "mark_replied_handler",
        event = "mark_attempts_exhausted",
        attempts = MAX_MARK_ATTEMPTS,
    );
    Err(error_response(409, "conflict", "Lead is being updated, retry later"))
}
