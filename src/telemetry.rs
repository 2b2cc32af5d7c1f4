use std::collections::VecDeque;

use serde::Deserialize;

/// Generation summary reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct TelemetryRow {
    pub generation: u32,
    pub distance: f64,
    pub epsilon: f64,
}

/// Chart series fed by the telemetry sink, one point per generation.
#[derive(Debug, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<u32>,
    pub distance: Vec<f64>,
    pub epsilon: Vec<f64>,
}

#[cfg(test)]
impl ChartSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Append-only generation log plus chart data. Only `clear` removes rows.
#[derive(Default)]
pub struct Telemetry {
    rows: VecDeque<TelemetryRow>,
    chart: ChartSeries,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: TelemetryRow) {
        self.rows.push_front(row);
        self.chart.labels.push(row.generation);
        self.chart.distance.push(row.distance);
        self.chart.epsilon.push(row.epsilon);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.chart.labels.clear();
        self.chart.distance.clear();
        self.chart.epsilon.clear();
    }

    /// Rows in display order, most recent first.
    pub fn rows(&self) -> impl Iterator<Item = &TelemetryRow> {
        self.rows.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn chart(&self) -> &ChartSeries {
        &self.chart
    }

    /// Best distance seen since the last hard reset.
    pub fn best_distance(&self) -> Option<f64> {
        self.chart.distance.iter().copied().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(generation: u32, distance: f64, epsilon: f64) -> TelemetryRow {
        TelemetryRow { generation, distance, epsilon }
    }

    #[test]
    fn test_rows_most_recent_first() {
        let mut t = Telemetry::new();
        t.push(row(2, 100.0, 0.9));
        t.push(row(3, 150.5, 0.85));
        t.push(row(4, 90.0, 0.8));
        let gens: Vec<u32> = t.rows().map(|r| r.generation).collect();
        assert_eq!(gens, vec![4, 3, 2]);
    }

    #[test]
    fn test_chart_series_chronological() {
        let mut t = Telemetry::new();
        t.push(row(2, 100.0, 0.9));
        t.push(row(3, 150.5, 0.85));
        let chart = t.chart();
        assert_eq!(chart.labels, vec![2, 3]);
        assert_eq!(chart.distance, vec![100.0, 150.5]);
        assert_eq!(chart.epsilon, vec![0.9, 0.85]);
    }

    #[test]
    fn test_clear_empties_log_and_series() {
        let mut t = Telemetry::new();
        for g in 2..10 {
            t.push(row(g, g as f64 * 10.0, 1.0 / g as f64));
        }
        t.clear();
        assert!(t.is_empty());
        assert!(t.chart().is_empty());
        assert!(t.chart().distance.is_empty());
        assert!(t.chart().epsilon.is_empty());
    }

    #[test]
    fn test_best_distance() {
        let mut t = Telemetry::new();
        assert_eq!(t.best_distance(), None);
        t.push(row(2, 40.0, 0.5));
        t.push(row(3, 2150.0, 0.4));
        t.push(row(4, 300.0, 0.3));
        assert_eq!(t.best_distance(), Some(2150.0));
    }

    #[test]
    fn test_row_deserializes_from_gen_log_payload() {
        let r: TelemetryRow =
            serde_json::from_str(r#"{"generation": 5, "distance": 812.4, "epsilon": 0.731}"#).unwrap();
        assert_eq!(r, row(5, 812.4, 0.731));
    }
}
