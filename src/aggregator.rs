use gdal::vector::Geometry;
use std::path::Path;

use crate::config::AggregatorConfig;
use crate::error::{AreaError, Result};
use crate::polygons::{PolygonSet, PolygonSource};
use crate::raster::ClassRaster;
use crate::table::{AreaTable, ClassificationTable};
use crate::tally::ClassCounts;

pub const TOTAL_AREA_COLUMN: &str = "tot_area_km2";
pub const CONSERVED_AREA_COLUMN: &str = "tot_cons_area_km2";
pub const CATEGORY_AREA_PREFIX: &str = "cons_area_km2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskMode {
    /// One combined masked column per polygon source.
    #[default]
    Aggregate,
    /// One masked column per protection category of each source.
    Categorical,
}

/// One masked pass: the output column and the polygons that define it.
struct MaskContext {
    column: String,
    geometries: Vec<Geometry>,
}

#[derive(Debug, Clone, Default)]
pub struct AreaAggregator {
    config: AggregatorConfig,
}

impl AreaAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Loads every input from disk and computes the total and conserved area of each class.
    ///
    /// Each source's `year`, when set, keeps only polygons founded in or before it. Every
    /// dataset is closed again before the areas are computed.
    pub fn total_and_conserved_area(
        &self,
        raster: &Path,
        classification_table: &Path,
        polygon_sources: &[PolygonSource],
        mode: MaskMode,
    ) -> Result<AreaTable> {
        let table = ClassificationTable::from_path(classification_table, self.config.sheet.as_deref())?;
        let raster = ClassRaster::open(raster)?;

        let mut polygon_sets = Vec::with_capacity(polygon_sources.len());
        for source in polygon_sources {
            let set = PolygonSet::open(source)?;
            let set = match source.year {
                Some(year) => set.founded_by(year)?,
                None => set,
            };
            polygon_sets.push(set);
        }

        self.aggregate(&raster, &table, &polygon_sets, mode)
    }

    /// Computes the area columns from inputs already in memory.
    pub fn aggregate(
        &self,
        raster: &ClassRaster,
        table: &ClassificationTable,
        polygon_sets: &[PolygonSet],
        mode: MaskMode,
    ) -> Result<AreaTable> {
        let raster_srs = raster.spatial_ref()?;
        for set in polygon_sets {
            set.ensure_same_crs(raster_srs.as_ref())?;
        }

        // 全マスクを先に組み立て、属性不足はここで失敗させる
        let contexts = mask_contexts(polygon_sets, mode)?;

        let resolution = raster.resolution();
        let codes = table.codes();
        let mut output = AreaTable::new(table.clone());

        let totals = ClassCounts::tally(raster.codes(), None, self.config.nodata);
        tracing::info!(
            "Tabulated {} valid pixels at {} m resolution",
            totals.total(),
            resolution
        );
        output.push_column(
            TOTAL_AREA_COLUMN.to_string(),
            totals.areas_km2(codes, resolution),
        );

        for context in contexts {
            let mask = raster.mask(&context.geometries, self.config.all_touched)?;
            let counts = ClassCounts::tally(raster.codes(), Some(&mask), self.config.nodata);
            if counts.is_empty() {
                tracing::warn!(
                    "No valid pixels inside the polygons of `{}`; areas are zero",
                    context.column
                );
            }
            tracing::debug!(
                "`{}`: {} polygons, {} pixels",
                context.column,
                context.geometries.len(),
                counts.total()
            );
            output.push_column(context.column, counts.areas_km2(codes, resolution));
        }

        Ok(output)
    }
}

/// [`AreaAggregator::total_and_conserved_area`] with the default configuration.
pub fn total_and_conserved_area(
    raster: &Path,
    classification_table: &Path,
    polygon_sources: &[PolygonSource],
    mode: MaskMode,
) -> Result<AreaTable> {
    AreaAggregator::new().total_and_conserved_area(raster, classification_table, polygon_sources, mode)
}

fn mask_contexts(polygon_sets: &[PolygonSet], mode: MaskMode) -> Result<Vec<MaskContext>> {
    // 複数ソースの場合のみ列名にソース名を付ける
    let qualify = polygon_sets.len() > 1;
    let mut contexts = Vec::new();

    for set in polygon_sets {
        match mode {
            MaskMode::Aggregate => {
                let column = if qualify {
                    format!("{}_{}", CONSERVED_AREA_COLUMN, set.name())
                } else {
                    CONSERVED_AREA_COLUMN.to_string()
                };
                push_context(&mut contexts, column, set.geometries())?;
            }
            MaskMode::Categorical => {
                for category in set.categories()? {
                    let column = if qualify {
                        format!("{}_{}_{}", CATEGORY_AREA_PREFIX, set.name(), category)
                    } else {
                        format!("{}_{}", CATEGORY_AREA_PREFIX, category)
                    };
                    push_context(&mut contexts, column, set.category_geometries(&category))?;
                }
            }
        }
    }

    Ok(contexts)
}

/// 同名の列は後の列で上書きされるため、重複はエラーにする
fn push_context(
    contexts: &mut Vec<MaskContext>,
    column: String,
    geometries: Vec<Geometry>,
) -> Result<()> {
    if contexts.iter().any(|c| c.column == column) {
        return Err(AreaError::DuplicateColumn { column });
    }
    contexts.push(MaskContext { column, geometries });
    Ok(())
}
