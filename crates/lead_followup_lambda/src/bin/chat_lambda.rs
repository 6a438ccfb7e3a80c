use lambda_runtime::{service_fn, Error, LambdaEvent};
use lead_followup_lambda::adapters::chat::{
    ChatCompleter, GeminiChatClient, DEFAULT_GEMINI_TIMEOUT,
};
use lead_followup_lambda::handlers::chat::{handle_chat_event, CorsPolicy};
use lead_followup_lambda::handlers::http::ApiGatewayResponse;
use lead_followup_lambda::logging::init_logging;
use lead_followup_lambda::settings::ChatSettings;
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    http_client: &reqwest::Client,
) -> Result<ApiGatewayResponse, Error> {
    let settings = match ChatSettings::from_env() {
        Ok(value) => value,
        Err(error) => {
            tracing::error!(
                component = "chat_lambda",
                event = "settings_invalid",
                error = %error,
            );
            return Ok(handle_chat_event(event.payload, None, &CorsPolicy::default()).await);
        }
    };
    let completer = settings.api_key.as_ref().map(|api_key| {
        GeminiChatClient::new(
            http_client.clone(),
            settings.api_url.as_str(),
            settings.model.as_str(),
            api_key.as_str(),
        )
        .with_timeout(settings.timeout)
    });

    Ok(handle_chat_event(
        event.payload,
        completer.as_ref().map(|value| value as &dyn ChatCompleter),
        &settings.cors,
    )
    .await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();
    // Each completion overrides this with GEMINI_TIMEOUT_SECS.
    let http_client = reqwest::Client::builder()
        .timeout(DEFAULT_GEMINI_TIMEOUT)
        .build()?;
    let http_client = &http_client;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, http_client).await
    }))
    .await
}
