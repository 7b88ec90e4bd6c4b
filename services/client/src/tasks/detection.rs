//! services/client/src/tasks/detection.rs
//!
//! Drives the detection workflow: select → normalize → upload → confirm.
//! Exactly one request is in flight at a time; commands issued while one is
//! pending are ignored by the store and reported as `None` here.

use crate::error::ClientError;
use crate::state::AppState;
use nutripet_core::domain::{Confirmation, Prediction};
use nutripet_core::stores::WorkflowError;
use tracing::{error, info};

/// Records the picked image on the workflow.
pub async fn select_image(app: &AppState, uri: &str, mime_type: &str) {
    app.detection.lock().await.select_image(uri, mime_type);
}

/// Uploads the selected image for food detection.
///
/// Returns `Ok(None)` when the command was ignored because an upload is
/// already in flight. The image is normalized to its canonical encoded form
/// before anything is transmitted.
pub async fn upload(app: &AppState) -> Result<Option<Prediction>, ClientError> {
    let (ticket, source) = {
        let mut workflow = app.detection.lock().await;
        let Some(ticket) = workflow.begin_upload()? else {
            info!("An upload is already in flight; command ignored.");
            return Ok(None);
        };
        let Some(source) = workflow.selected_image().cloned() else {
            return Err(ClientError::Internal(
                "upload started without a selected image".to_string(),
            ));
        };
        (ticket, source)
    };

    info!("Normalizing '{}' for upload.", source.uri);
    let image = match app.normalizer.normalize(&source).await {
        Ok(image) => image,
        Err(err) => {
            error!("Image normalization failed: {}", err);
            let failure = WorkflowError::from(err);
            app.detection
                .lock()
                .await
                .apply_upload(ticket, Err(failure.clone()));
            return Err(ClientError::Workflow(failure));
        }
    };

    info!(
        "Uploading {} bytes ({}) for detection.",
        image.bytes.len(),
        image.mime_type
    );
    let result = app.api.detect_food(&image).await;

    let mut workflow = app.detection.lock().await;
    match result {
        Ok(prediction) => {
            info!("Prediction received: '{}'.", prediction.predicted_food);
            workflow.apply_upload(ticket, Ok(prediction.clone()));
            Ok(Some(prediction))
        }
        Err(err) => {
            error!("Food detection failed: {}", err);
            let failure = WorkflowError::from(err);
            workflow.apply_upload(ticket, Err(failure.clone()));
            Err(ClientError::Workflow(failure))
        }
    }
}

/// Confirms the current prediction, feeding the meal to the character.
///
/// Returns `Ok(None)` when the command was ignored (request in flight, or the
/// prediction is already confirmed). At most one confirm attempt is made per
/// prediction; there is no automatic retry.
pub async fn confirm(app: &AppState) -> Result<Option<Confirmation>, ClientError> {
    let (ticket, food_history_id) = {
        let mut workflow = app.detection.lock().await;
        let Some(ticket) = workflow.begin_confirm()? else {
            info!("Confirm command ignored in the current phase.");
            return Ok(None);
        };
        let Some(food_history_id) = workflow.food_history_id() else {
            return Err(ClientError::Internal(
                "confirm started without a prediction".to_string(),
            ));
        };
        (ticket, food_history_id)
    };

    info!("Confirming food history entry {}.", food_history_id);
    let result = app.api.confirm_food(food_history_id).await;

    let mut workflow = app.detection.lock().await;
    match result {
        Ok(confirmation) => {
            info!(
                "Confirmed; character is now level {}.",
                confirmation.character.level
            );
            workflow.apply_confirm(ticket, Ok(confirmation.clone()));
            Ok(Some(confirmation))
        }
        Err(err) => {
            error!("Confirmation failed: {}", err);
            let failure = WorkflowError::from(err);
            workflow.apply_confirm(ticket, Err(failure.clone()));
            Err(ClientError::Workflow(failure))
        }
    }
}

/// Abandons the current workflow and returns it to `Empty`.
pub async fn reset(app: &AppState) {
    app.detection.lock().await.reset();
}
