use gdal::raster::{rasterize, RasterizeOptions};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::Geometry;
use gdal::{Dataset, DriverManager};
use std::path::Path;

use crate::error::{AreaError, GdalResultExt, InputKind, Result};

/// A classified single-band raster held fully in memory.
#[derive(Debug, Clone)]
pub struct ClassRaster {
    codes: Vec<i32>,
    cols: usize,
    rows: usize,
    geo_transform: [f64; 6],
    projection: String,
}

impl ClassRaster {
    /// Reads band 1 of the raster at `path`. The file handle is released before returning.
    pub fn open(path: &Path) -> Result<Self> {
        // データセットを開く
        let dataset = Dataset::open(path).map_err(|e| AreaError::InputNotFound {
            input: InputKind::Raster,
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // サイズ・ジオトランスフォーム・座標系を取得
        let (cols, rows) = dataset.raster_size();
        let geo_transform = dataset
            .geo_transform()
            .context("reading raster geo transform")?;
        let projection = dataset.projection();

        // バンド1を全画素読み込む
        let band = dataset.rasterband(1).context("getting raster band 1")?;
        let buffer = band
            .read_as::<i32>((0, 0), (cols, rows), (cols, rows), None)
            .context("reading raster class codes")?;
        let (_, codes) = buffer.into_shape_and_vec();

        tracing::info!("Loaded raster {:?}: {} x {} pixels", path, cols, rows);

        Self::from_parts(codes, cols, rows, geo_transform, projection)
    }

    /// Wraps row-major class codes. `projection` is WKT, or empty when unknown.
    pub fn from_parts(
        codes: Vec<i32>,
        cols: usize,
        rows: usize,
        geo_transform: [f64; 6],
        projection: impl Into<String>,
    ) -> Result<Self> {
        if codes.len() != cols * rows {
            return Err(AreaError::ShapeMismatch {
                cols,
                rows,
                len: codes.len(),
            });
        }

        let width = geo_transform[1];
        if !width.is_finite() || width == 0.0 {
            return Err(AreaError::InvalidResolution(width));
        }
        // 正方形画素を前提とする
        if (geo_transform[5].abs() - width.abs()).abs() > f64::EPSILON * width.abs() {
            tracing::warn!(
                "Non-square pixels ({} x {}); areas use the pixel width",
                width.abs(),
                geo_transform[5].abs()
            );
        }

        Ok(Self {
            codes,
            cols,
            rows,
            geo_transform,
            projection: projection.into(),
        })
    }

    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn geo_transform(&self) -> [f64; 6] {
        self.geo_transform
    }

    /// Pixel width in the raster's ground units (metres).
    pub fn resolution(&self) -> f64 {
        self.geo_transform[1].abs()
    }

    /// `None` when the raster declares no projection; an unparsable one is an error.
    pub fn spatial_ref(&self) -> Result<Option<SpatialRef>> {
        if self.projection.is_empty() {
            return Ok(None);
        }
        SpatialRef::from_wkt(&self.projection)
            .map(Some)
            .context("parsing raster projection")
    }

    /// Marks the pixels covered by `geometries`. Geometries must be in the raster's coordinates.
    pub fn mask(&self, geometries: &[Geometry], all_touched: bool) -> Result<Vec<bool>> {
        // マスク用のメモリ上データセットを作成
        let driver = DriverManager::get_driver_by_name("MEM").context("getting MEM driver")?;
        let mut dataset = driver
            .create_with_band_type::<u8, _>("", self.cols, self.rows, 1)
            .context("creating mask dataset")?;

        // ジオトランスフォームと座標系を元ラスタに合わせる
        dataset
            .set_geo_transform(&self.geo_transform)
            .context("setting mask geo transform")?;
        if !self.projection.is_empty() {
            dataset
                .set_projection(&self.projection)
                .context("setting mask projection")?;
        }

        // ポリゴン内の画素に 1 を焼き込む（初期値は 0）
        if !geometries.is_empty() {
            let burn_values = vec![1.0; geometries.len()];
            let options = RasterizeOptions {
                all_touched,
                ..Default::default()
            };
            rasterize(&mut dataset, &[1], geometries, &burn_values, Some(options))
                .context("rasterizing polygons")?;
        }

        // マスクを読み戻す
        let band = dataset.rasterband(1).context("getting mask band")?;
        let buffer = band
            .read_as::<u8>((0, 0), (self.cols, self.rows), (self.cols, self.rows), None)
            .context("reading mask band")?;
        let (_, values) = buffer.into_shape_and_vec();

        let mask: Vec<bool> = values.into_iter().map(|v| v != 0).collect();
        tracing::debug!(
            "Rasterized {} geometries onto {} of {} pixels",
            geometries.len(),
            mask.iter().filter(|&&inside| inside).count(),
            mask.len()
        );
        Ok(mask)
    }
}
