//! crates/nutripet_core/src/stores/detection.rs
//!
//! The detection workflow: pick image → upload → receive prediction →
//! confirm. One workflow instance is active at a time; every phase change
//! goes through the transitions defined here.

use crate::domain::{Confirmation, ImageSource, Prediction};
use crate::ports::{GatewayError, PortError};

/// Lifecycle of one detection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionPhase {
    Empty,
    ImageSelected,
    Uploading,
    Predicted,
    Confirming,
    Confirmed,
    Failed,
}

/// The failures the workflow surfaces to its consumers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// A local device capability (camera, file access) was denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// `upload()` was issued without a selected image.
    #[error("no image selected")]
    NoImageSelected,
    /// Transport failure, no response received.
    #[error("network error: {0}")]
    NetworkError(String),
    /// The backend rejected the request with a displayable message.
    #[error("{0}")]
    ServerRejected(String),
    /// Authentication failure; token refresh is the session store's job, not
    /// the workflow's.
    #[error("unauthorized")]
    Unauthorized,
    /// `confirm()` was issued with no prediction to confirm.
    #[error("no prediction to confirm")]
    MissingPrediction,
}

impl From<GatewayError> for WorkflowError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Network(msg) => WorkflowError::NetworkError(msg),
            GatewayError::Unauthorized => WorkflowError::Unauthorized,
            GatewayError::Server { message, .. } => WorkflowError::ServerRejected(message),
            GatewayError::Malformed(msg) => {
                WorkflowError::ServerRejected(format!("malformed response: {msg}"))
            }
        }
    }
}

impl From<PortError> for WorkflowError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::PermissionDenied(msg) => WorkflowError::PermissionDenied(msg),
            PortError::Unexpected(msg) => WorkflowError::ServerRejected(msg),
        }
    }
}

/// Ties an in-flight upload to the workflow generation that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    seq: u64,
}

/// Ties an in-flight confirm to the workflow generation that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmTicket {
    seq: u64,
}

/// The detection workflow store.
#[derive(Debug)]
pub struct DetectionWorkflow {
    phase: DetectionPhase,
    selected_image: Option<ImageSource>,
    prediction: Option<Prediction>,
    confirmation: Option<Confirmation>,
    error: Option<WorkflowError>,
    seq: u64,
}

impl Default for DetectionWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionWorkflow {
    pub fn new() -> Self {
        Self {
            phase: DetectionPhase::Empty,
            selected_image: None,
            prediction: None,
            confirmation: None,
            error: None,
            seq: 0,
        }
    }

    pub fn phase(&self) -> DetectionPhase {
        self.phase
    }

    pub fn selected_image(&self) -> Option<&ImageSource> {
        self.selected_image.as_ref()
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        self.error.as_ref()
    }

    /// Selects (or re-selects) an image, overwriting any prior selection and
    /// discarding stale prediction state. Ignored while a request is in
    /// flight.
    pub fn select_image(&mut self, uri: impl Into<String>, mime_type: impl Into<String>) {
        if matches!(
            self.phase,
            DetectionPhase::Uploading | DetectionPhase::Confirming
        ) {
            return;
        }
        self.selected_image = Some(ImageSource {
            uri: uri.into(),
            mime_type: mime_type.into(),
        });
        self.prediction = None;
        self.confirmation = None;
        self.error = None;
        self.phase = DetectionPhase::ImageSelected;
    }

    /// Starts the upload.
    ///
    /// Returns `Ok(None)` while a request is already in flight (the command is
    /// ignored, no duplicate request), and `NoImageSelected` when there is
    /// nothing to upload from the current phase.
    pub fn begin_upload(&mut self) -> Result<Option<UploadTicket>, WorkflowError> {
        match self.phase {
            DetectionPhase::Uploading | DetectionPhase::Confirming => Ok(None),
            DetectionPhase::ImageSelected => {
                self.seq += 1;
                self.phase = DetectionPhase::Uploading;
                self.error = None;
                Ok(Some(UploadTicket { seq: self.seq }))
            }
            _ => Err(WorkflowError::NoImageSelected),
        }
    }

    /// Applies the outcome of an upload. Responses from a superseded
    /// generation (the workflow was reset mid-flight) are dropped.
    pub fn apply_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<Prediction, WorkflowError>,
    ) {
        if ticket.seq != self.seq {
            return;
        }
        match result {
            Ok(prediction) => {
                self.prediction = Some(prediction);
                self.error = None;
                self.phase = DetectionPhase::Predicted;
            }
            Err(err) => self.fail(err),
        }
    }

    /// Starts the confirm step. Fails with `MissingPrediction` when no
    /// prediction (and thus no `food_history_id`) is present; at most one
    /// confirm attempt is made per prediction.
    pub fn begin_confirm(&mut self) -> Result<Option<ConfirmTicket>, WorkflowError> {
        match self.phase {
            DetectionPhase::Uploading
            | DetectionPhase::Confirming
            | DetectionPhase::Confirmed => Ok(None),
            DetectionPhase::Predicted if self.prediction.is_some() => {
                self.seq += 1;
                self.phase = DetectionPhase::Confirming;
                self.error = None;
                Ok(Some(ConfirmTicket { seq: self.seq }))
            }
            _ => Err(WorkflowError::MissingPrediction),
        }
    }

    /// Applies the outcome of a confirm request.
    pub fn apply_confirm(
        &mut self,
        ticket: ConfirmTicket,
        result: Result<Confirmation, WorkflowError>,
    ) {
        if ticket.seq != self.seq {
            return;
        }
        match result {
            Ok(confirmation) => {
                self.confirmation = Some(confirmation);
                self.error = None;
                self.phase = DetectionPhase::Confirmed;
            }
            Err(err) => self.fail(err),
        }
    }

    /// The `food_history_id` the confirm call needs, if a prediction exists.
    pub fn food_history_id(&self) -> Option<i64> {
        self.prediction.as_ref().map(|p| p.food_history_id)
    }

    /// Returns to `Empty`, clearing selection, prediction, confirmation and
    /// error. Any in-flight response becomes stale and will be dropped.
    pub fn reset(&mut self) {
        self.seq += 1;
        self.phase = DetectionPhase::Empty;
        self.selected_image = None;
        self.prediction = None;
        self.confirmation = None;
        self.error = None;
    }

    // Detection is a transaction: a failure clears its partial results, unlike
    // the stats store which keeps stale data around.
    fn fail(&mut self, err: WorkflowError) {
        self.prediction = None;
        self.confirmation = None;
        self.error = Some(err);
        self.phase = DetectionPhase::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Nutrition;
    use chrono::Utc;

    fn prediction(id: i64) -> Prediction {
        Prediction {
            food_history_id: id,
            predicted_food: "nasi goreng".to_string(),
            nutrition: Nutrition {
                calories: 512.0,
                protein: 14.2,
                carbohydrate: 68.0,
                fat: 18.5,
            },
            received_at: Utc::now(),
        }
    }

    fn confirmation(id: i64) -> Confirmation {
        Confirmation {
            food_history_id: id,
            character: crate::domain::CharacterStats {
                level: 3,
                status_name: "healthy".to_string(),
                health_point: 82.0,
                xp_point: 140.0,
                xp_to_next_level: 300.0,
            },
        }
    }

    #[test]
    fn happy_path_walks_the_transition_table() {
        let mut wf = DetectionWorkflow::new();
        assert_eq!(wf.phase(), DetectionPhase::Empty);

        wf.select_image("file://a.jpg", "image/jpeg");
        assert_eq!(wf.phase(), DetectionPhase::ImageSelected);

        let ticket = wf.begin_upload().unwrap().unwrap();
        assert_eq!(wf.phase(), DetectionPhase::Uploading);

        wf.apply_upload(ticket, Ok(prediction(7)));
        assert_eq!(wf.phase(), DetectionPhase::Predicted);
        assert_eq!(wf.food_history_id(), Some(7));

        let ticket = wf.begin_confirm().unwrap().unwrap();
        assert_eq!(wf.phase(), DetectionPhase::Confirming);

        wf.apply_confirm(ticket, Ok(confirmation(7)));
        assert_eq!(wf.phase(), DetectionPhase::Confirmed);
        assert_eq!(wf.confirmation().unwrap().character.level, 3);
    }

    #[test]
    fn upload_from_empty_fails_fast() {
        let mut wf = DetectionWorkflow::new();
        assert_eq!(wf.begin_upload(), Err(WorkflowError::NoImageSelected));
        assert_eq!(wf.phase(), DetectionPhase::Empty);
    }

    #[test]
    fn upload_while_uploading_is_a_no_op() {
        let mut wf = DetectionWorkflow::new();
        wf.select_image("file://a.jpg", "image/jpeg");
        let _ticket = wf.begin_upload().unwrap().unwrap();

        // Second command is ignored: no state change, no second ticket.
        assert_eq!(wf.begin_upload(), Ok(None));
        assert_eq!(wf.phase(), DetectionPhase::Uploading);
    }

    #[test]
    fn upload_failure_stores_the_server_message() {
        let mut wf = DetectionWorkflow::new();
        wf.select_image("file://a.jpg", "image/jpeg");
        let ticket = wf.begin_upload().unwrap().unwrap();

        wf.apply_upload(
            ticket,
            Err(GatewayError::Server {
                status: 422,
                message: "too blurry".to_string(),
            }
            .into()),
        );

        assert_eq!(wf.phase(), DetectionPhase::Failed);
        assert_eq!(
            wf.error(),
            Some(&WorkflowError::ServerRejected("too blurry".to_string()))
        );
        assert!(wf.prediction().is_none());
    }

    #[test]
    fn confirm_without_prediction_fails_without_phase_change() {
        let mut wf = DetectionWorkflow::new();
        wf.select_image("file://a.jpg", "image/jpeg");

        assert_eq!(wf.begin_confirm(), Err(WorkflowError::MissingPrediction));
        assert_eq!(wf.phase(), DetectionPhase::ImageSelected);
    }

    #[test]
    fn confirm_after_confirmed_is_a_no_op() {
        let mut wf = DetectionWorkflow::new();
        wf.select_image("file://a.jpg", "image/jpeg");
        let ticket = wf.begin_upload().unwrap().unwrap();
        wf.apply_upload(ticket, Ok(prediction(7)));
        let ticket = wf.begin_confirm().unwrap().unwrap();
        wf.apply_confirm(ticket, Ok(confirmation(7)));

        assert_eq!(wf.begin_confirm(), Ok(None));
        assert_eq!(wf.phase(), DetectionPhase::Confirmed);
    }

    #[test]
    fn reset_clears_everything_from_any_phase() {
        let mut wf = DetectionWorkflow::new();
        wf.select_image("file://a.jpg", "image/jpeg");
        let ticket = wf.begin_upload().unwrap().unwrap();
        wf.apply_upload(ticket, Ok(prediction(7)));

        wf.reset();

        assert_eq!(wf.phase(), DetectionPhase::Empty);
        assert!(wf.selected_image().is_none());
        assert!(wf.prediction().is_none());
        assert!(wf.confirmation().is_none());
        assert!(wf.error().is_none());
    }

    #[test]
    fn response_arriving_after_reset_is_dropped() {
        let mut wf = DetectionWorkflow::new();
        wf.select_image("file://a.jpg", "image/jpeg");
        let ticket = wf.begin_upload().unwrap().unwrap();

        // User abandons the workflow while the request is in flight.
        wf.reset();
        wf.apply_upload(ticket, Ok(prediction(7)));

        assert_eq!(wf.phase(), DetectionPhase::Empty);
        assert!(wf.prediction().is_none());
    }

    #[test]
    fn reselecting_overwrites_a_failed_attempt() {
        let mut wf = DetectionWorkflow::new();
        wf.select_image("file://a.jpg", "image/jpeg");
        let ticket = wf.begin_upload().unwrap().unwrap();
        wf.apply_upload(ticket, Err(WorkflowError::NetworkError("down".to_string())));
        assert_eq!(wf.phase(), DetectionPhase::Failed);

        wf.select_image("file://b.png", "image/png");
        assert_eq!(wf.phase(), DetectionPhase::ImageSelected);
        assert_eq!(wf.selected_image().unwrap().uri, "file://b.png");
        assert!(wf.error().is_none());
    }

    #[test]
    fn select_image_is_ignored_mid_flight() {
        let mut wf = DetectionWorkflow::new();
        wf.select_image("file://a.jpg", "image/jpeg");
        let _ticket = wf.begin_upload().unwrap().unwrap();

        wf.select_image("file://b.png", "image/png");
        assert_eq!(wf.phase(), DetectionPhase::Uploading);
        assert_eq!(wf.selected_image().unwrap().uri, "file://a.jpg");
    }
}
