use std::sync::Arc;

use merx_core::AuthService;

/// Shared application state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}
