//! Comment submission - form validation, intake endpoints and the submit lifecycle

mod flow;
mod form;
mod intake;

use std::sync::Arc;
use std::time::Duration;

pub use flow::{CommentFlow, SubmissionState, SubmitError};
pub use form::{CommentDraft, FieldErrors};
pub use intake::{CommentIntake, HttpCommentIntake, IntakeError, IntakeResponse, StoreIntake};

use crate::config::SiteConfig;
use crate::content::ContentSource;

/// Pick the intake the configuration asks for
///
/// A configured remote endpoint wins; otherwise comments go straight to the
/// content store.
pub fn open_intake(
    config: &SiteConfig,
    source: Arc<dyn ContentSource>,
) -> Result<Arc<dyn CommentIntake>, IntakeError> {
    match &config.comments.endpoint {
        Some(endpoint) => {
            tracing::info!("Sending comments to {}", endpoint);
            let timeout = Duration::from_secs(config.content.timeout_secs.max(1));
            Ok(Arc::new(HttpCommentIntake::new(endpoint.clone(), timeout)?))
        }
        None => Ok(Arc::new(StoreIntake::new(source))),
    }
}
