use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::{info, info_span, warn, Instrument};
use zbot_core::Event;

use crate::error::WebhookError;
use crate::signature::SIGNATURE_HEADER;
use crate::state::AppState;

pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /webhook: verify, normalize and hand the event to the dispatcher.
///
/// The response is sent as soon as the event is normalized; rule loading and
/// execution continue in a background task.
pub async fn receive(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), WebhookError> {
    let delivery = header(&headers, DELIVERY_HEADER).unwrap_or_default().to_string();

    if let Err(err) = app.secret.verify(header(&headers, SIGNATURE_HEADER), &body) {
        warn!(delivery = %delivery, "rejected webhook with bad signature");
        return Err(err);
    }

    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|err| {
        warn!(delivery = %delivery, error = %err, "rejected unparseable webhook payload");
        WebhookError::from(err)
    })?;

    let event_name = header(&headers, EVENT_HEADER).unwrap_or_default();
    let event = Event::normalize(event_name, &payload);
    let event_type = event.event_type();
    info!(delivery = %delivery, header = event_name, event = event_type, "webhook accepted");

    let dispatcher = app.dispatcher.clone();
    let span = info_span!("delivery", delivery = %delivery, event = event_type);
    tokio::spawn(
        async move {
            dispatcher.handle_event(&event).await;
        }
        .instrument(span),
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "delivery": delivery, "event": event_type })),
    ))
}
