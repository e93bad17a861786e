//! Price points and daily-return series.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub value: f64,
}

/// Ordered daily simple returns for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    pub symbol: String,
    pub returns: Vec<DailyReturn>,
}

impl ReturnSeries {
    /// Build from raw closes: sorted by date, duplicate dates collapse to the
    /// last close seen, non-finite or non-positive closes are dropped.
    pub fn from_prices(symbol: &str, prices: &[PricePoint]) -> Self {
        let closes: BTreeMap<NaiveDate, f64> = prices
            .iter()
            .filter(|p| p.close.is_finite() && p.close > 0.0)
            .map(|p| (p.date, p.close))
            .collect();

        let ordered: Vec<(NaiveDate, f64)> = closes.into_iter().collect();
        let returns = ordered
            .windows(2)
            .map(|w| DailyReturn {
                date: w[1].0,
                value: w[1].1 / w[0].1 - 1.0,
            })
            .collect();

        ReturnSeries {
            symbol: symbol.to_string(),
            returns,
        }
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Values on the dates both series share, in date order.
    pub fn aligned_with(&self, other: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.returns.len() && j < other.returns.len() {
            let a = &self.returns[i];
            let b = &other.returns[j];
            match a.date.cmp(&b.date) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    left.push(a.value);
                    right.push(b.value);
                    i += 1;
                    j += 1;
                }
            }
        }
        (left, right)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1); `None` below two points.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Pearson correlation; `None` for length mismatch, fewer than two points or zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom < f64::EPSILON {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// OLS slope of `ys` on `xs`; `None` when `xs` has no variance.
pub fn beta(ys: &[f64], xs: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        var_x += (x - mx) * (x - mx);
    }
    if var_x < f64::EPSILON * f64::EPSILON {
        return None;
    }
    Some(cov / var_x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn point(d: u32, close: f64) -> PricePoint {
        PricePoint {
            date: date(d),
            close,
        }
    }

    #[test]
    fn returns_from_unsorted_prices() {
        let series = ReturnSeries::from_prices("A", &[point(3, 121.0), point(1, 100.0), point(2, 110.0)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.returns[0].date, date(2));
        assert!((series.returns[0].value - 0.10).abs() < 1e-12);
        assert!((series.returns[1].value - 0.10).abs() < 1e-12);
    }

    #[test]
    fn duplicate_dates_keep_last_close() {
        let series = ReturnSeries::from_prices("A", &[point(1, 100.0), point(1, 200.0), point(2, 220.0)]);
        assert_eq!(series.len(), 1);
        assert!((series.returns[0].value - 0.10).abs() < 1e-12);
    }

    #[test]
    fn invalid_closes_dropped() {
        let series = ReturnSeries::from_prices(
            "A",
            &[point(1, 100.0), point(2, 0.0), point(3, f64::NAN), point(4, 105.0)],
        );
        assert_eq!(series.len(), 1);
        assert_eq!(series.returns[0].date, date(4));
        assert!((series.returns[0].value - 0.05).abs() < 1e-12);
    }

    #[test]
    fn single_price_gives_empty_series() {
        let series = ReturnSeries::from_prices("A", &[point(1, 100.0)]);
        assert!(series.is_empty());
    }

    #[test]
    fn aligned_with_uses_date_intersection() {
        let a = ReturnSeries::from_prices("A", &[point(1, 100.0), point(2, 101.0), point(3, 102.0), point(5, 103.0)]);
        let b = ReturnSeries::from_prices("B", &[point(2, 50.0), point(3, 51.0), point(4, 52.0), point(5, 53.0)]);
        let (x, y) = a.aligned_with(&b);
        // A has returns on 2,3,5; B has returns on 3,4,5
        assert_eq!(x.len(), 2);
        assert_eq!(y.len(), 2);
    }

    #[test]
    fn pearson_perfect_positive_and_negative() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let zs = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&xs, &ys).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &zs).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_zero_variance_is_none() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn beta_of_scaled_series() {
        let xs = [0.01, -0.02, 0.03, 0.0];
        let ys: Vec<f64> = xs.iter().map(|x| 1.5 * x).collect();
        assert!((beta(&ys, &xs).unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn std_dev_is_sample_deviation() {
        let sd = std_dev(&[0.01, -0.01, 0.01, -0.01]).unwrap();
        assert!((sd - (0.0004_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(std_dev(&[0.5]), None);
    }

    #[test]
    fn beta_flat_proxy_is_none() {
        assert_eq!(beta(&[0.1, 0.2], &[0.0, 0.0]), None);
    }
}
