use std::sync::Arc;

use crate::auth::google::TokenVerifier;
use crate::auth::policy::AccessPolicy;
use crate::config::Config;
use crate::practice_log::store::PracticeLogStore;
use crate::video_log::store::VideoLogStore;
use crate::youtube::VideoPlatform;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every backend sits behind a trait object so handler tests can swap in
/// in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub practice_log: Arc<dyn PracticeLogStore>,
    pub video_log: Arc<dyn VideoLogStore>,
    pub youtube: Arc<dyn VideoPlatform>,
    pub verifier: Arc<dyn TokenVerifier>,
    /// Default: `AllowList` built from ALLOWED_EMAILS.
    pub policy: Arc<dyn AccessPolicy>,
}
