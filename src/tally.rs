use std::collections::HashMap;

const M2_PER_KM2: f64 = 1_000_000.0;

/// Pixel count per class code, nodata already removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassCounts {
    counts: HashMap<i32, u64>,
}

impl ClassCounts {
    /// Counts every pixel of `codes`, or only the pixels whose `mask` entry is set.
    pub fn tally(codes: &[i32], mask: Option<&[bool]>, nodata: i32) -> Self {
        let mut counts = HashMap::new();

        match mask {
            Some(mask) => {
                for (&code, _) in codes.iter().zip(mask).filter(|(_, inside)| **inside) {
                    *counts.entry(code).or_insert(0) += 1;
                }
            }
            None => {
                for &code in codes {
                    *counts.entry(code).or_insert(0) += 1;
                }
            }
        }

        // NoData は集計しない
        counts.remove(&nodata);

        Self { counts }
    }

    pub fn count(&self, code: i32) -> u64 {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Area in km² for `code` given the pixel width in metres; 0 when the class is absent.
    pub fn area_km2(&self, code: i32, resolution: f64) -> f64 {
        self.count(code) as f64 * resolution.powi(2) / M2_PER_KM2
    }

    /// One area per class code, in the order of `codes`.
    pub fn areas_km2(&self, codes: &[i32], resolution: f64) -> Vec<f64> {
        codes
            .iter()
            .map(|&code| self.area_km2(code, resolution))
            .collect()
    }
}
