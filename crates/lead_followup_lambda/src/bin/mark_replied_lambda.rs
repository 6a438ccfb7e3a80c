use lambda_runtime::{service_fn, Error, LambdaEvent};
use lead_followup_lambda::adapters::s3_store::S3LeadStore;
use lead_followup_lambda::handlers::http::{error_response, ApiGatewayResponse};
use lead_followup_lambda::handlers::mark_replied::handle_mark_replied_event;
use lead_followup_lambda::logging::init_logging;
use lead_followup_lambda::settings::StoreSettings;
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    s3_client: &aws_sdk_s3::Client,
) -> Result<ApiGatewayResponse, Error> {
    let settings = match StoreSettings::from_env() {
        Ok(value) => value,
        Err(error) => {
            tracing::error!(
                component = "mark_replied_lambda",
                event = "settings_invalid",
                error = %error,
            );
            return Ok(error_response(500, "misconfigured", "Mark replied error"));
        }
    };

    let store = S3LeadStore::new(s3_client.clone(), settings.bucket, settings.prefix);
    Ok(handle_mark_replied_event(event.payload, &store).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);
    let s3_client = &s3_client;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, s3_client).await
    }))
    .await
}
