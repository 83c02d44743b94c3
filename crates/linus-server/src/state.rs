//! Shared application state.

use linus_core::LinusConfig;

use crate::service::GridService;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: LinusConfig,
    pub service: GridService,
}

impl AppState {
    pub fn new(config: LinusConfig) -> Self {
        let service = GridService::new(&config);
        Self { config, service }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_service_uses_configured_state_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut config = LinusConfig::default().with_state_path(&path);
        config.save_debounce = Duration::ZERO;

        let state = AppState::new(config);
        assert_eq!(state.config.state_path, path);
        assert!(!path.exists());

        state.service.post_segments(Default::default()).await;
        assert!(path.exists());
    }
}
