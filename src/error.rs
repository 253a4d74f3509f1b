use gdal::errors::GdalError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AreaError>;

/// Which input a failure refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Raster,
    ClassificationTable,
    PolygonSource(String),
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Raster => write!(f, "raster"),
            InputKind::ClassificationTable => write!(f, "classification table"),
            InputKind::PolygonSource(name) => write!(f, "polygon source `{}`", name),
        }
    }
}

#[derive(Error, Debug)]
pub enum AreaError {
    #[error("{input} could not be opened at {}: {reason}", path.display())]
    InputNotFound {
        input: InputKind,
        path: PathBuf,
        reason: String,
    },

    #[error("{input} is missing required column `{column}`")]
    MissingRequiredColumn { input: InputKind, column: String },

    #[error("polygon source `{source_name}` has no foundation date attribute to filter by year {year}")]
    InvalidYearFilter { source_name: String, year: i32 },

    #[error("polygon source `{source_name}` does not share the raster's coordinate system")]
    CoordinateSystemMismatch { source_name: String },

    #[error("area column `{column}` would be produced by more than one mask")]
    DuplicateColumn { column: String },

    #[error("classification table row {row}: `{value}` is not an integer class code")]
    InvalidClassCode { row: usize, value: String },

    #[error("raster pixel width must be a finite non-zero number, got {0}")]
    InvalidResolution(f64),

    #[error("raster of {cols}x{rows} pixels cannot hold {len} values")]
    ShapeMismatch { cols: usize, rows: usize, len: usize },

    #[error("GDAL failed while {stage}")]
    Gdal {
        stage: &'static str,
        #[source]
        source: GdalError,
    },
}

/// `anyhow::Context` 風に GDAL エラーへ処理段階を付ける
pub trait GdalResultExt<T> {
    fn context(self, stage: &'static str) -> Result<T>;
}

impl<T> GdalResultExt<T> for std::result::Result<T, GdalError> {
    fn context(self, stage: &'static str) -> Result<T> {
        self.map_err(|source| AreaError::Gdal { stage, source })
    }
}
