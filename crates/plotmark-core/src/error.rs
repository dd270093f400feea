pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Invalid Pull Request number: {input:?} (expected a whole number, or blank for all)")]
    InvalidFilterInput { input: String },

    #[error("Plotly plot with class \"{class_name}\" (index {index}) not found")]
    ChartNotFound { class_name: String, index: usize },

    #[error("Could not find the target SVG container (index {index}) with class \"{class_name}\"")]
    SurfaceNotFound { class_name: String, index: usize },

    #[error("Invalid chart data: {message}")]
    InvalidChartData { message: String },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("chart JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
