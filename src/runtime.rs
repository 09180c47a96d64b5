use std::sync::Arc;

use tracing::info;
use warp::Filter;

use crate::clients::calcom_client::{BookingDefaults, CalComClient};
use crate::clients::openai_client::OpenAIClient;
use crate::config::Settings;
use crate::handlers::chat;
use crate::handlers::dispatcher::ToolDispatcher;
use crate::service::openai_service::OpenAIService;

/// Clients built once at startup and shared by every turn.
pub struct Services {
    pub calcom: Arc<CalComClient>,
    pub dispatcher: Arc<ToolDispatcher>,
}

pub fn build_services(settings: &Settings) -> Result<Services, reqwest::Error> {
    let http = reqwest::Client::builder()
        .timeout(settings.http_timeout)
        .build()?;

    let calcom = Arc::new(CalComClient::new(
        http.clone(),
        &settings.calcom.base_url,
        &settings.calcom.api_key,
        BookingDefaults {
            event_type_id: settings.calcom.event_type_id,
            attendee_name: settings.calcom.attendee_name.clone(),
            attendee_email: settings.calcom.attendee_email.clone(),
            time_zone: settings.time_zone.name().to_string(),
            language: settings.calcom.language.clone(),
        },
    ));

    let model = Arc::new(OpenAIService::new(
        OpenAIClient::new(http, &settings.openai.base_url, &settings.openai.api_key),
        settings.openai.model.clone(),
        settings.openai.resolver_model.clone(),
    ));

    let dispatcher = Arc::new(ToolDispatcher::new(
        model,
        calcom.clone(),
        settings.time_zone,
    ));

    Ok(Services { calcom, dispatcher })
}

pub async fn run_api(settings: Settings) -> anyhow::Result<()> {
    let services = build_services(&settings)?;
    let routes = chat::routes(services.dispatcher).recover(chat::handle_rejection);

    info!(
        event_name = "system.server.started",
        bind_address = %settings.bind_address,
        time_zone = settings.time_zone.name(),
        "chat endpoint listening"
    );
    warp::serve(routes).run(settings.bind_address).await;
    Ok(())
}
