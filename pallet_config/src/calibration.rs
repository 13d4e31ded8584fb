//! Calibration constants and the CSV fitting that produces them.
//!
//! Model: `units = (raw - offset) / scale_factor`, i.e. `scale_factor` is raw
//! counts per weight unit and `offset` is the tare baseline in raw counts.
use serde::Deserialize;

/// Calibration CSV schema.
///
/// Expected headers:
/// raw,units
///
/// Example:
/// raw,units
/// 8429,0.0
/// 30929,1.0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub raw: i64,
    pub units: f32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Calibration {
    /// Raw counts per weight unit.
    pub scale_factor: f32,
    /// Tare baseline in raw counts.
    pub offset: i64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            offset: 0,
        }
    }
}

impl Calibration {
    /// Least-squares fit of `units = a*raw + b` over all rows, converted to
    /// `scale_factor = 1/a` and `offset = round(-b/a)`.
    pub fn from_rows(rows: &[CalibrationRow]) -> eyre::Result<Self> {
        if rows.len() < 2 {
            eyre::bail!("calibration requires at least two rows, got {}", rows.len());
        }
        for (i, pair) in rows.windows(2).enumerate() {
            if let [a, b] = pair
                && a.raw == b.raw
            {
                eyre::bail!(
                    "calibration rows have duplicate raw values at index {} and {}",
                    i,
                    i + 1
                );
            }
        }

        let n = rows.len() as f64;
        let mean_x = rows.iter().map(|r| r.raw as f64).sum::<f64>() / n;
        let mean_y = rows.iter().map(|r| f64::from(r.units)).sum::<f64>() / n;
        let (sxx, sxy) = rows.iter().fold((0.0f64, 0.0f64), |(sxx, sxy), r| {
            let dx = r.raw as f64 - mean_x;
            let dy = f64::from(r.units) - mean_y;
            (sxx + dx * dx, sxy + dx * dy)
        });
        if !sxx.is_finite() || sxx == 0.0 {
            eyre::bail!("calibration cannot determine slope (degenerate raw variance)");
        }
        let a = sxy / sxx;
        if !a.is_finite() || a == 0.0 {
            eyre::bail!("calibration produced zero or non-finite slope");
        }
        let b = mean_y - a * mean_x;
        let offset = -b / a;
        if !offset.is_finite() {
            eyre::bail!("calibration produced invalid tare baseline");
        }

        Ok(Self {
            scale_factor: (1.0 / a) as f32,
            offset: offset.round() as i64,
        })
    }

    /// `(raw - offset) / scale_factor`, saturating on extreme offsets.
    #[inline]
    pub fn to_units(&self, raw: i64) -> f32 {
        (raw.saturating_sub(self.offset) as f64 / f64::from(self.scale_factor)) as f32
    }
}

impl TryFrom<&[CalibrationRow]> for Calibration {
    type Error = eyre::Report;
    fn try_from(rows: &[CalibrationRow]) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<Calibration> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<&str> = headers.iter().collect();
    if actual != ["raw", "units"] {
        eyre::bail!(
            "calibration CSV must have headers 'raw,units', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }

    Calibration::from_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_point_fit_recovers_factor_and_offset() {
        let rows = [
            CalibrationRow {
                raw: 8_000,
                units: 0.0,
            },
            CalibrationRow {
                raw: 30_000,
                units: 1.0,
            },
        ];
        let cal = Calibration::from_rows(&rows).expect("fit");
        assert!((cal.scale_factor - 22_000.0).abs() < 0.5);
        assert_eq!(cal.offset, 8_000);
        assert!((cal.to_units(52_000) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn to_units_saturates_instead_of_overflowing() {
        let cal = Calibration {
            scale_factor: 1.0,
            offset: i64::MAX,
        };
        assert_eq!(cal.to_units(i64::MIN), i64::MIN as f32);
    }

    #[test]
    fn single_row_is_rejected() {
        let rows = [CalibrationRow { raw: 1, units: 0.0 }];
        assert!(Calibration::from_rows(&rows).is_err());
    }

    #[test]
    fn duplicate_raw_is_rejected() {
        let rows = [
            CalibrationRow { raw: 5, units: 0.0 },
            CalibrationRow { raw: 5, units: 1.0 },
        ];
        let err = Calibration::from_rows(&rows).expect_err("duplicate");
        assert!(err.to_string().contains("duplicate raw"));
    }
}
