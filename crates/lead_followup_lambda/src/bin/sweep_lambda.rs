//! Scheduled follow-up sweep. Triggered by an EventBridge rule; the payload is
//! ignored.

use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use lead_followup_core::contract::SweepResponse;
use lead_followup_lambda::adapters::notifier::{FollowUpNotifier, ResendNotifier};
use lead_followup_lambda::adapters::s3_store::S3LeadStore;
use lead_followup_lambda::handlers::sweep::handle_sweep_trigger;
use lead_followup_lambda::logging::init_logging;
use lead_followup_lambda::settings::{
    NotifierSettings, SettingsError, StoreSettings, SweepSettings,
};
use serde_json::Value;

struct RuntimeDependencies {
    s3_client: aws_sdk_s3::Client,
    http_client: reqwest::Client,
}

async fn handle_request(
    _event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<SweepResponse, Error> {
    let (store_settings, sweep_settings) = match load_settings() {
        Ok(value) => value,
        Err(error) => {
            tracing::error!(
                component = "sweep_lambda",
                event = "settings_invalid",
                error = %error,
            );
            return Ok(SweepResponse::error(format!(
                "Follow-up check error: {error}"
            )));
        }
    };
    let notifier_settings = NotifierSettings::from_env();

    let store = S3LeadStore::new(
        deps.s3_client.clone(),
        store_settings.bucket,
        store_settings.prefix,
    );
    let notifier = notifier_settings.api_key.as_ref().map(|api_key| {
        ResendNotifier::new(
            deps.http_client.clone(),
            notifier_settings.api_url.as_str(),
            api_key.as_str(),
            notifier_settings.from.as_str(),
        )
    });
    let config = sweep_settings.sweep_config(Utc::now().timestamp_millis());

    Ok(handle_sweep_trigger(
        &store,
        notifier.as_ref().map(|value| value as &dyn FollowUpNotifier),
        &config,
    )
    .await)
}

fn load_settings() -> Result<(StoreSettings, SweepSettings), SettingsError> {
    Ok((StoreSettings::from_env()?, SweepSettings::from_env()?))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let deps = RuntimeDependencies {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
        http_client: reqwest::Client::new(),
    };
    let deps = &deps;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, deps).await
    }))
    .await
}
