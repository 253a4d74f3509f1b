use chrono::{Datelike, NaiveDate};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{FieldValue, Geometry, LayerAccess};
use gdal::Dataset;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AreaError, GdalResultExt, InputKind, Result};

/// Designation year attribute.
pub const FOUNDATION_DATE_FIELD: &str = "legalFoundationDate";
/// Protection category attribute.
pub const CATEGORY_FIELD: &str = "iucnCategory";

/// A named vector dataset of protected areas, optionally limited to areas founded by `year`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSource {
    pub name: String,
    pub path: PathBuf,
    pub year: Option<i32>,
}

impl PolygonSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            year: None,
        }
    }

    pub fn founded_by(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

#[derive(Clone)]
pub struct ProtectedArea {
    pub geometry: Geometry,
    pub foundation_year: Option<i32>,
    pub category: Option<String>,
}

impl fmt::Debug for ProtectedArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectedArea")
            .field("foundation_year", &self.foundation_year)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Protected-area polygons loaded from one vector source.
#[derive(Debug, Clone)]
pub struct PolygonSet {
    name: String,
    areas: Vec<ProtectedArea>,
    has_foundation_date: bool,
    has_category: bool,
    spatial_ref: Option<SpatialRef>,
}

impl PolygonSet {
    /// In-memory set; an attribute counts as present when any area carries it.
    pub fn new(name: impl Into<String>, areas: Vec<ProtectedArea>) -> Self {
        Self {
            name: name.into(),
            has_foundation_date: areas.iter().any(|a| a.foundation_year.is_some()),
            has_category: areas.iter().any(|a| a.category.is_some()),
            areas,
            spatial_ref: None,
        }
    }

    /// Reads the first layer of the source. The dataset is closed before returning.
    pub fn open(source: &PolygonSource) -> Result<Self> {
        Self::open_path(&source.name, &source.path)
    }

    fn open_path(name: &str, path: &Path) -> Result<Self> {
        let not_found = |reason: String| AreaError::InputNotFound {
            input: InputKind::PolygonSource(name.to_string()),
            path: path.to_path_buf(),
            reason,
        };

        let dataset = Dataset::open(path).map_err(|e| not_found(e.to_string()))?;
        if dataset.layer_count() == 0 {
            return Err(not_found("dataset contains no vector layers".to_string()));
        }
        let mut layer = dataset.layer(0).context("opening polygon layer")?;

        // 属性フィールドの位置を調べる
        let field_names: Vec<String> = layer.defn().fields().map(|f| f.name()).collect();
        let date_idx = field_names.iter().position(|n| n == FOUNDATION_DATE_FIELD);
        let category_idx = field_names.iter().position(|n| n == CATEGORY_FIELD);
        let spatial_ref = layer.spatial_ref();

        let mut areas = Vec::new();
        for (i, feature) in layer.features().enumerate() {
            let Some(geometry) = feature.geometry() else {
                tracing::debug!("Skipping feature {} of `{}` without geometry", i, name);
                continue;
            };

            let foundation_year = match date_idx {
                Some(idx) => feature
                    .field(idx)
                    .context("reading foundation date")?
                    .and_then(year_of),
                None => None,
            };
            let category = match category_idx {
                Some(idx) => feature
                    .field(idx)
                    .context("reading protection category")?
                    .and_then(FieldValue::into_string)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                None => None,
            };

            areas.push(ProtectedArea {
                geometry: geometry.clone(),
                foundation_year,
                category,
            });
        }

        tracing::info!(
            "Loaded polygon source `{}` from {:?}: {} polygons",
            name,
            path,
            areas.len()
        );

        Ok(Self {
            name: name.to_string(),
            areas,
            has_foundation_date: date_idx.is_some(),
            has_category: category_idx.is_some(),
            spatial_ref,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn areas(&self) -> &[ProtectedArea] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn spatial_ref(&self) -> Option<&SpatialRef> {
        self.spatial_ref.as_ref()
    }

    /// Keeps only the areas founded in or before `year`; areas without a date are dropped.
    pub fn founded_by(&self, year: i32) -> Result<Self> {
        if !self.has_foundation_date {
            return Err(AreaError::InvalidYearFilter {
                source_name: self.name.clone(),
                year,
            });
        }

        let areas: Vec<ProtectedArea> = self
            .areas
            .iter()
            .filter(|a| a.foundation_year.is_some_and(|y| y <= year))
            .cloned()
            .collect();
        tracing::debug!(
            "`{}`: {} of {} polygons founded by {}",
            self.name,
            areas.len(),
            self.areas.len(),
            year
        );

        Ok(Self {
            areas,
            ..self.clone()
        })
    }

    /// Distinct protection categories in first-encountered order.
    pub fn categories(&self) -> Result<Vec<String>> {
        if !self.has_category {
            return Err(AreaError::MissingRequiredColumn {
                input: InputKind::PolygonSource(self.name.clone()),
                column: CATEGORY_FIELD.to_string(),
            });
        }

        let mut categories: Vec<String> = Vec::new();
        for category in self.areas.iter().filter_map(|a| a.category.as_ref()) {
            if !categories.contains(category) {
                categories.push(category.clone());
            }
        }
        Ok(categories)
    }

    pub fn geometries(&self) -> Vec<Geometry> {
        self.areas.iter().map(|a| a.geometry.clone()).collect()
    }

    pub fn category_geometries(&self, category: &str) -> Vec<Geometry> {
        self.areas
            .iter()
            .filter(|a| a.category.as_deref() == Some(category))
            .map(|a| a.geometry.clone())
            .collect()
    }

    /// Fails when both sides declare a coordinate system and they differ.
    pub fn ensure_same_crs(&self, raster: Option<&SpatialRef>) -> Result<()> {
        match (self.spatial_ref.as_ref(), raster) {
            (Some(polygons), Some(raster)) => {
                if same_crs(polygons, raster) {
                    Ok(())
                } else {
                    Err(AreaError::CoordinateSystemMismatch {
                        source_name: self.name.clone(),
                    })
                }
            }
            _ => {
                tracing::warn!(
                    "Coordinate system of `{}` or the raster is unknown; assuming they match",
                    self.name
                );
                Ok(())
            }
        }
    }
}

fn same_crs(a: &SpatialRef, b: &SpatialRef) -> bool {
    if a == b {
        return true;
    }
    match (a.auth_name(), a.auth_code(), b.auth_name(), b.auth_code()) {
        (Some(name_a), Ok(code_a), Some(name_b), Ok(code_b)) => {
            name_a.eq_ignore_ascii_case(&name_b) && code_a == code_b
        }
        _ => false,
    }
}

/// Designation year from an integer, real, date, datetime or `YYYY...` string field.
fn year_of(value: FieldValue) -> Option<i32> {
    match value {
        FieldValue::IntegerValue(year) => Some(year),
        FieldValue::Integer64Value(year) => i32::try_from(year).ok(),
        FieldValue::RealValue(year) if year.is_finite() => Some(year.floor() as i32),
        FieldValue::DateValue(date) => Some(date.year()),
        FieldValue::DateTimeValue(datetime) => Some(datetime.year()),
        FieldValue::StringValue(s) => year_of_str(s.trim()),
        _ => None,
    }
}

/// `YYYY` で始まる文字列、または日.月.年 / 日/月/年 形式の日付
fn year_of_str(s: &str) -> Option<i32> {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 4 {
        return s[..4].parse().ok();
    }

    ["%d.%m.%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .map(|date| date.year())
}
