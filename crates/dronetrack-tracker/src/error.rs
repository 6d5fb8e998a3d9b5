use dronetrack_client::StoreError;
use dronetrack_core::ParamsError;

use crate::tracker::Viewer;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("invalid tracking parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("failed to load {what}: {source}")]
    Load {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{0} viewers cannot control playback")]
    NotAuthorized(Viewer),

    #[error("failed to start delivery: {0}")]
    StartDelivery(#[source] StoreError),

    #[error("order {0} has no drone mission to poll")]
    NoMission(String),
}
