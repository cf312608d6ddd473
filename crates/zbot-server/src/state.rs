use std::sync::Arc;

use zbot_core::Dispatcher;

use crate::signature::WebhookSecret;

/// Shared, cheaply cloneable application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub secret: WebhookSecret,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, secret: WebhookSecret) -> Self {
        Self { dispatcher, secret }
    }
}
