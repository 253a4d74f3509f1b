use gdal::raster::Buffer;
use gdal::DriverManager;
use std::fs;
use std::path::Path;

/// 100 m 画素、原点 (0, 400) の 4x4 グリッド
pub const GEO_TRANSFORM: [f64; 6] = [0.0, 100.0, 0.0, 400.0, 0.0, -100.0];

pub fn drivers_available(names: &[&str]) -> bool {
    names
        .iter()
        .all(|name| DriverManager::get_driver_by_name(name).is_ok())
}

/// Writes a single-band u8 GeoTIFF; `cols * rows` must equal `values.len()`.
pub fn write_raster(path: &Path, cols: usize, rows: usize, values: Vec<u8>, projection: Option<&str>) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<u8, _>(path, cols, rows, 1)
        .unwrap();
    dataset.set_geo_transform(&GEO_TRANSFORM).unwrap();
    if let Some(wkt) = projection {
        dataset.set_projection(wkt).unwrap();
    }

    let mut band = dataset.rasterband(1).unwrap();
    band.set_no_data_value(Some(255.0)).unwrap();
    let mut buffer = Buffer::new((cols, rows), values);
    band.write((0, 0), (cols, rows), &mut buffer).unwrap();
}

/// Writes a GeoJSON feature collection of `(polygon coordinates, properties)` JSON pairs.
pub fn write_geojson(path: &Path, features: &[(String, &str)], crs: Option<&str>) {
    let features: Vec<String> = features
        .iter()
        .map(|(coordinates, properties)| {
            format!(
                r#"{{"type":"Feature","properties":{},"geometry":{{"type":"Polygon","coordinates":{}}}}}"#,
                properties, coordinates
            )
        })
        .collect();

    let crs = crs
        .map(|name| format!(r#""crs":{{"type":"name","properties":{{"name":"{}"}}}},"#, name))
        .unwrap_or_default();

    let json = format!(
        r#"{{"type":"FeatureCollection",{}"features":[{}]}}"#,
        crs,
        features.join(",")
    );
    fs::write(path, json).unwrap();
}

/// Polygon ring covering the pixel block `[col0, col1) x [row0, row1)` of [`GEO_TRANSFORM`].
pub fn pixel_block(col0: usize, row0: usize, col1: usize, row1: usize) -> String {
    let x0 = col0 as f64 * 100.0;
    let x1 = col1 as f64 * 100.0;
    let y0 = 400.0 - row0 as f64 * 100.0;
    let y1 = 400.0 - row1 as f64 * 100.0;
    format!(
        "[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]",
        x0 = x0,
        x1 = x1,
        y0 = y0,
        y1 = y1
    )
}
