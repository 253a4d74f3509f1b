/// 土地被覆ラスタの NoData コード
pub const NODATA_CODE: i32 = 255;

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Class code excluded from every area column.
    pub nodata: i32,
    /// Count every pixel a polygon touches instead of only those whose centre it covers.
    pub all_touched: bool,
    /// Worksheet holding the classification table; the first sheet when `None`.
    pub sheet: Option<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            nodata: NODATA_CODE,
            all_touched: false,
            sheet: None,
        }
    }
}
