use std::sync::Arc;

use crate::services::{image_service::ImageService, session::SessionGate};

/// Shared, immutable request state. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub images: ImageService,
    pub sessions: Arc<SessionGate>,
}

impl AppState {
    pub fn new(images: ImageService, sessions: SessionGate) -> Self {
        Self {
            images,
            sessions: Arc::new(sessions),
        }
    }
}
