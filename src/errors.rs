use thiserror::Error;

#[derive(Debug, Error)]
pub enum VizCueError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Grid cell {cell} is outside the {rows}x{cols} grid")]
    OutOfBounds { cell: String, rows: u32, cols: u32 },

    #[error("Coordinate conversion error: {0}")]
    CoordinateConversion(String),

    #[error("Point ({x}, {y}) is outside the {width}x{height} screen")]
    OutOfScreenBounds { x: i32, y: i32, width: u32, height: u32 },

    #[error("Action declined by user")]
    ActionDeclined,

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Request cancelled")]
    Cancelled,
}

impl VizCueError {
    /// Failures of an outside collaborator (capture, model, upload, input, IO).
    /// These are surfaced to the user and abandon the request in progress.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            VizCueError::Capture(_)
                | VizCueError::Model(_)
                | VizCueError::Upload(_)
                | VizCueError::Input(_)
                | VizCueError::Io(_)
                | VizCueError::Http(_)
        )
    }
}

impl serde::Serialize for VizCueError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type VizCueResult<T> = Result<T, VizCueError>;
