//! Result table types for decision curve analysis.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Strategy name for the treat-everyone reference.
pub const TREAT_ALL: &str = "all";
/// Strategy name for the treat-no-one reference.
pub const TREAT_NONE: &str = "none";

/// One row of the long-format result table: a strategy evaluated at one
/// threshold probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaRow {
    /// Predictor name, or `"all"` / `"none"` for the reference strategies.
    pub strategy: String,
    /// Threshold probability this row was evaluated at.
    pub threshold: f64,
    /// Subjects used for this strategy (complete cases for the predictor).
    pub n: usize,
    /// Estimated count of true positives among `n` subjects.
    pub tp_est: f64,
    /// Estimated count of false positives among `n` subjects.
    pub fp_est: f64,
    /// Net benefit, in units of net true positives per subject.
    pub net_benefit: f64,
    /// Net benefit re-expressed against treat-all, in units of avoided
    /// interventions per subject.
    pub net_intervention_avoided: f64,
    /// Per-subject harm applied to this strategy.
    pub harm: f64,
    /// True when the underlying survival estimate was carried forward past
    /// the last observed event time (low confidence).
    pub extrapolated: bool,
    /// Smoothed net benefit, present only when smoothing was requested. The
    /// raw `net_benefit` remains the source of truth.
    pub smoothed_net_benefit: Option<f64>,
}

impl DcaRow {
    /// Check whether this row belongs to a reference strategy.
    pub fn is_reference(&self) -> bool {
        self.strategy == TREAT_ALL || self.strategy == TREAT_NONE
    }

    /// Net interventions avoided per `per` subjects (e.g. per 100).
    pub fn interventions_avoided_per(&self, per: f64) -> f64 {
        self.net_intervention_avoided * per
    }
}

/// The frozen long-format result table.
///
/// Rows are appended during aggregation in strategy-major, threshold-ascending
/// order (references first, then predictors in insertion order) and never
/// mutated afterwards; every view below is a read-only projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaTable {
    rows: Vec<DcaRow>,
}

impl DcaTable {
    pub(crate) fn new(rows: Vec<DcaRow>) -> Self {
        Self { rows }
    }

    /// All rows in aggregation order.
    pub fn rows(&self) -> &[DcaRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &DcaRow> {
        self.rows.iter()
    }

    /// Distinct strategy names in aggregation order.
    pub fn strategies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if names.last() != Some(&row.strategy.as_str()) {
                names.push(&row.strategy);
            }
        }
        names
    }

    /// Rows for one strategy, thresholds ascending.
    pub fn for_strategy(&self, strategy: &str) -> Vec<&DcaRow> {
        self.rows.iter().filter(|r| r.strategy == strategy).collect()
    }

    /// Rows restricted to thresholds in `[min, max]`.
    pub fn restrict_thresholds(&self, min: f64, max: f64) -> Vec<&DcaRow> {
        self.rows
            .iter()
            .filter(|r| r.threshold >= min && r.threshold <= max)
            .collect()
    }

    /// The strategy with the highest net benefit at the given threshold,
    /// among rows evaluated at exactly that threshold.
    pub fn best_strategy_at(&self, threshold: f64) -> Option<&DcaRow> {
        self.rows
            .iter()
            .filter(|r| r.threshold == threshold)
            .max_by(|a, b| a.net_benefit.total_cmp(&b.net_benefit))
    }

    /// The net-interventions-avoided projection, scaled per `per` subjects.
    ///
    /// This is a first-class transform over the same table rather than a
    /// separate computation path.
    pub fn interventions_avoided(&self, per: f64) -> Vec<InterventionsAvoided> {
        self.rows
            .iter()
            .map(|r| InterventionsAvoided {
                strategy: r.strategy.clone(),
                threshold: r.threshold,
                avoided: r.interventions_avoided_per(per),
            })
            .collect()
    }

    /// Summary counts for the table.
    pub fn summary(&self) -> TableSummary {
        let strategies = self.strategies();
        let n_thresholds = strategies
            .first()
            .map(|s| self.for_strategy(s).len())
            .unwrap_or(0);
        TableSummary {
            n_rows: self.len(),
            n_strategies: strategies.len(),
            n_thresholds,
            n_extrapolated: self.rows.iter().filter(|r| r.extrapolated).count(),
        }
    }

    /// Write the table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(
            writer,
            "strategy\tthreshold\tn\ttp_est\tfp_est\tnet_benefit\tnet_intervention_avoided\tharm\textrapolated\tsmoothed_net_benefit"
        )?;
        for r in &self.rows {
            let smoothed = r
                .smoothed_net_benefit
                .map(|v| format!("{:.6}", v))
                .unwrap_or_else(|| "NA".to_string());
            writeln!(
                writer,
                "{}\t{:.4}\t{}\t{:.4}\t{:.4}\t{:.6}\t{:.6}\t{:.4}\t{}\t{}",
                r.strategy,
                r.threshold,
                r.n,
                r.tp_est,
                r.fp_est,
                r.net_benefit,
                r.net_intervention_avoided,
                r.harm,
                r.extrapolated,
                smoothed
            )?;
        }
        Ok(())
    }

    /// Serialize the table to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One entry of the interventions-avoided projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionsAvoided {
    pub strategy: String,
    pub threshold: f64,
    /// Avoided interventions per the requested number of subjects.
    pub avoided: f64,
}

/// Summary counts for a result table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub n_rows: usize,
    pub n_strategies: usize,
    pub n_thresholds: usize,
    pub n_extrapolated: usize,
}

impl std::fmt::Display for TableSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Decision curve table")?;
        writeln!(f, "  Rows:          {}", self.n_rows)?;
        writeln!(f, "  Strategies:    {}", self.n_strategies)?;
        writeln!(f, "  Thresholds:    {}", self.n_thresholds)?;
        writeln!(f, "  Extrapolated:  {}", self.n_extrapolated)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    fn row(strategy: &str, threshold: f64, nb: f64) -> DcaRow {
        DcaRow {
            strategy: strategy.to_string(),
            threshold,
            n: 100,
            tp_est: 20.0,
            fp_est: 10.0,
            net_benefit: nb,
            net_intervention_avoided: 0.05,
            harm: 0.0,
            extrapolated: false,
            smoothed_net_benefit: None,
        }
    }

    fn example_table() -> DcaTable {
        DcaTable::new(vec![
            row(TREAT_ALL, 0.1, 0.11),
            row(TREAT_ALL, 0.2, 0.0),
            row(TREAT_NONE, 0.1, 0.0),
            row(TREAT_NONE, 0.2, 0.0),
            row("model", 0.1, 0.15),
            row("model", 0.2, 0.12),
        ])
    }

    #[test]
    fn test_strategies_order() {
        let table = example_table();
        assert_eq!(table.strategies(), vec![TREAT_ALL, TREAT_NONE, "model"]);
    }

    #[test]
    fn test_for_strategy() {
        let table = example_table();
        let rows = table.for_strategy("model");
        assert_eq!(rows.len(), 2);
        assert_relative_eq!(rows[0].threshold, 0.1);
        assert_relative_eq!(rows[1].threshold, 0.2);
    }

    #[test]
    fn test_restrict_thresholds() {
        let table = example_table();
        assert_eq!(table.restrict_thresholds(0.15, 0.25).len(), 3);
    }

    #[test]
    fn test_best_strategy_at() {
        let table = example_table();
        let best = table.best_strategy_at(0.1).unwrap();
        assert_eq!(best.strategy, "model");
        assert!(table.best_strategy_at(0.5).is_none());
    }

    #[test]
    fn test_interventions_avoided_projection() {
        let table = example_table();
        let proj = table.interventions_avoided(100.0);
        assert_eq!(proj.len(), table.len());
        assert_relative_eq!(proj[0].avoided, 5.0);
    }

    #[test]
    fn test_summary() {
        let table = example_table();
        let summary = table.summary();
        assert_eq!(summary.n_rows, 6);
        assert_eq!(summary.n_strategies, 3);
        assert_eq!(summary.n_thresholds, 2);
        assert_eq!(summary.n_extrapolated, 0);
        let text = format!("{}", summary);
        assert!(text.contains("Strategies:    3"));
    }

    #[test]
    fn test_to_tsv() {
        let table = example_table();
        let file = NamedTempFile::new().unwrap();
        table.to_tsv(file.path()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.starts_with("strategy\tthreshold"));
        // Header plus one line per row.
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn test_to_json() {
        let table = example_table();
        let json = table.to_json().unwrap();
        assert!(json.contains("\"strategy\""));
    }
}
