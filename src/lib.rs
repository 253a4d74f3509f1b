pub mod aggregator;
pub mod config;
pub mod error;
pub mod polygons;
pub mod raster;
pub mod table;
pub mod tally;

#[cfg(test)]
mod test_support;

pub use aggregator::{total_and_conserved_area, AreaAggregator, MaskMode};
pub use config::AggregatorConfig;
pub use error::{AreaError, InputKind, Result};
pub use polygons::{PolygonSet, PolygonSource, ProtectedArea};
pub use raster::ClassRaster;
pub use table::{AreaColumn, AreaTable, Cell, ClassificationTable};
pub use tally::ClassCounts;
