#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map widget failed to initialize: {0}")]
    InitializationFailed(String),
    #[error("map widget was destroyed before the map became available")]
    Destroyed,
    #[error("camera position state is already bound to a map")]
    CameraAlreadyBound,
}
