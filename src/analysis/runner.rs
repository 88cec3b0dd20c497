//! Analysis runner: configure, execute, and aggregate a decision curve run.

use crate::benefit::{net_benefit, net_intervention_avoided, HarmSpec};
use crate::classify::{normalize_scores, would_act};
use crate::data::{Cohort, DcaRow, DcaTable, OutcomeData, Predictor, TREAT_ALL, TREAT_NONE};
use crate::error::{DcaError, Result};
use crate::estimate::{validate_horizon, Estimator, RiskFractions};
use crate::grid::ThresholdGrid;
use crate::smooth::{smooth_loess, SmoothConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// The outcome regime governing one analysis run. Exactly one regime applies
/// per run; every predictor shares it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Regime {
    /// Event occurred / did not.
    Binary,
    /// Time-to-event, evaluated at a fixed horizon.
    Survival { time_horizon: f64, competing: bool },
    /// Case-control sampling with externally supplied prevalence.
    CaseControl { prevalence: f64 },
}

/// Regime tag used in serialized configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegimeKind {
    Binary,
    Survival,
    CaseControl,
}

/// Serialized form of a regime, with optional fields resolved at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    pub kind: RegimeKind,
    /// Required when `kind` is `survival`.
    #[serde(default)]
    pub time_horizon: Option<f64>,
    /// Competing-risks semantics for the survival regime.
    #[serde(default)]
    pub competing: bool,
    /// Required when `kind` is `case-control`.
    #[serde(default)]
    pub prevalence: Option<f64>,
}

impl RegimeConfig {
    /// Resolve into a validated [`Regime`].
    ///
    /// # Errors
    /// `InvalidTimeHorizon` when the survival regime lacks a horizon;
    /// `MissingPrevalence` when the case-control regime lacks a prevalence.
    pub fn resolve(&self) -> Result<Regime> {
        match self.kind {
            RegimeKind::Binary => Ok(Regime::Binary),
            RegimeKind::Survival => {
                let time_horizon = self.time_horizon.ok_or_else(|| {
                    DcaError::InvalidTimeHorizon(
                        "a time horizon is required for the survival regime".to_string(),
                    )
                })?;
                Ok(Regime::Survival {
                    time_horizon,
                    competing: self.competing,
                })
            }
            RegimeKind::CaseControl => {
                let prevalence = self.prevalence.ok_or(DcaError::MissingPrevalence)?;
                Ok(Regime::CaseControl { prevalence })
            }
        }
    }
}

impl From<Regime> for RegimeConfig {
    fn from(regime: Regime) -> Self {
        match regime {
            Regime::Binary => Self {
                kind: RegimeKind::Binary,
                time_horizon: None,
                competing: false,
                prevalence: None,
            },
            Regime::Survival {
                time_horizon,
                competing,
            } => Self {
                kind: RegimeKind::Survival,
                time_horizon: Some(time_horizon),
                competing,
                prevalence: None,
            },
            Regime::CaseControl { prevalence } => Self {
                kind: RegimeKind::CaseControl,
                time_horizon: None,
                competing: false,
                prevalence: Some(prevalence),
            },
        }
    }
}

fn default_min_at_risk() -> usize {
    1
}

/// Serializable analysis configuration, the YAML mirror of [`DcaAnalysis`].
///
/// Data-sized inputs (the cohort and any per-subject risk vector) are passed
/// to `run` directly and never serialized here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaConfig {
    pub regime: RegimeConfig,
    /// Explicit threshold grid; the default dense sweep when absent.
    #[serde(default)]
    pub thresholds: Option<Vec<f64>>,
    /// Per-predictor harms; 0 for predictors without an entry.
    #[serde(default)]
    pub harm: HarmSpec,
    /// Optional smoothing of each predictor's net-benefit series.
    #[serde(default)]
    pub smooth: Option<SmoothConfig>,
    /// Minimum subjects at risk at the survival horizon.
    #[serde(default = "default_min_at_risk")]
    pub min_at_risk: usize,
}

impl DcaConfig {
    /// Load from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(DcaError::from)
    }

    /// Save to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(DcaError::from)
    }
}

/// A predictor that failed validation and was excluded from the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedPredictor {
    pub name: String,
    pub reason: String,
}

/// Output of an analysis run: the frozen table plus any skipped predictors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaOutput {
    /// The frozen long-format result table.
    pub table: DcaTable,
    /// Predictors excluded by per-predictor failures. Regime-level failures
    /// abort the run instead.
    pub skipped: Vec<SkippedPredictor>,
}

/// Builder for configuring and executing a decision curve analysis.
#[derive(Debug, Clone)]
pub struct DcaAnalysis {
    regime: Regime,
    grid: Option<ThresholdGrid>,
    harm: HarmSpec,
    smooth: Option<SmoothConfig>,
    min_at_risk: usize,
    subject_risk: Option<Vec<f64>>,
}

impl DcaAnalysis {
    fn with_regime(regime: Regime) -> Self {
        Self {
            regime,
            grid: None,
            harm: HarmSpec::new(),
            smooth: None,
            min_at_risk: default_min_at_risk(),
            subject_risk: None,
        }
    }

    /// An analysis of a binary outcome.
    pub fn binary() -> Self {
        Self::with_regime(Regime::Binary)
    }

    /// An analysis of a time-to-event outcome at the given horizon.
    pub fn survival(time_horizon: f64) -> Self {
        Self::with_regime(Regime::Survival {
            time_horizon,
            competing: false,
        })
    }

    /// An analysis of case-control data with the given population prevalence.
    pub fn case_control(prevalence: f64) -> Self {
        Self::with_regime(Regime::CaseControl { prevalence })
    }

    /// Build from a serialized configuration.
    pub fn from_config(config: &DcaConfig) -> Result<Self> {
        let regime = config.regime.resolve()?;
        let grid = match &config.thresholds {
            Some(thresholds) => Some(ThresholdGrid::new(thresholds.clone())?),
            None => None,
        };
        Ok(Self {
            regime,
            grid,
            harm: config.harm.clone(),
            smooth: config.smooth,
            min_at_risk: config.min_at_risk,
            subject_risk: None,
        })
    }

    /// The serializable mirror of this analysis.
    pub fn config(&self) -> DcaConfig {
        DcaConfig {
            regime: self.regime.into(),
            thresholds: self.grid.as_ref().map(|g| g.thresholds().to_vec()),
            harm: self.harm.clone(),
            smooth: self.smooth,
            min_at_risk: self.min_at_risk,
        }
    }

    /// Override the default threshold grid.
    pub fn with_thresholds(mut self, grid: ThresholdGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Set the per-subject harm of acting on a predictor.
    pub fn with_harm(mut self, predictor: impl Into<String>, harm: f64) -> Result<Self> {
        self.harm.set(predictor, harm)?;
        Ok(self)
    }

    /// Annotate each predictor's rows with a smoothed net-benefit series.
    pub fn with_smoothing(mut self, config: SmoothConfig) -> Self {
        self.smooth = Some(config);
        self
    }

    /// Competing-risks semantics for the survival regime.
    pub fn competing_risks(mut self, competing: bool) -> Self {
        if let Regime::Survival {
            time_horizon,
            competing: _,
        } = self.regime
        {
            self.regime = Regime::Survival {
                time_horizon,
                competing,
            };
        }
        self
    }

    /// Minimum subjects that must remain at risk at the survival horizon.
    pub fn with_min_at_risk(mut self, min_at_risk: usize) -> Self {
        self.min_at_risk = min_at_risk;
        self
    }

    /// Supply externally modeled per-subject event probabilities at the
    /// horizon (e.g. from a Cox fit) instead of the nonparametric subgroup
    /// estimate.
    pub fn with_subject_risk(mut self, risk: Vec<f64>) -> Self {
        self.subject_risk = Some(risk);
        self
    }

    /// Run the analysis over a cohort.
    ///
    /// Reference strategies are always included. Per-predictor failures are
    /// reported in `skipped` without aborting the remaining predictors;
    /// regime-level failures abort the run.
    pub fn run(&self, cohort: &Cohort) -> Result<DcaOutput> {
        let grid = self
            .grid
            .clone()
            .unwrap_or_else(ThresholdGrid::default_sweep);
        self.validate_regime(cohort)?;

        let n = cohort.n();
        let full_mask: Vec<usize> = (0..n).collect();
        let full = MaskedOutcome::build(
            &self.regime,
            cohort.outcome(),
            self.subject_risk.as_deref(),
            &full_mask,
        )?;
        let all_fractions = full.estimator().treat_all()?;

        let mut rows = Vec::with_capacity((cohort.predictors().len() + 2) * grid.len());
        rows.extend(reference_rows(&all_fractions, &grid, n));

        let per_predictor: Vec<Result<Vec<DcaRow>>> = cohort
            .predictors()
            .par_iter()
            .map(|predictor| self.predictor_rows(predictor, cohort, &grid, &all_fractions))
            .collect();

        let mut skipped = Vec::new();
        for (predictor, outcome) in cohort.predictors().iter().zip(per_predictor) {
            match outcome {
                Ok(predictor_rows) => rows.extend(predictor_rows),
                Err(err) => skipped.push(SkippedPredictor {
                    name: predictor.name.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        Ok(DcaOutput {
            table: DcaTable::new(rows),
            skipped,
        })
    }

    fn validate_regime(&self, cohort: &Cohort) -> Result<()> {
        match (&self.regime, cohort.outcome()) {
            (Regime::Binary, OutcomeData::Binary(_)) => Ok(()),
            (
                Regime::Survival { time_horizon, .. },
                OutcomeData::Survival { times, .. },
            ) => {
                validate_horizon(times, *time_horizon, self.min_at_risk)?;
                if let Some(risk) = &self.subject_risk {
                    if risk.len() != cohort.n() {
                        return Err(DcaError::MismatchedLength {
                            expected: cohort.n(),
                            actual: risk.len(),
                        });
                    }
                }
                Ok(())
            }
            (Regime::CaseControl { prevalence }, OutcomeData::CaseControl(_)) => {
                if !(prevalence.is_finite() && *prevalence > 0.0 && *prevalence < 1.0) {
                    return Err(DcaError::InvalidParameter(format!(
                        "Prevalence must lie in the open interval (0, 1), got {}",
                        prevalence
                    )));
                }
                Ok(())
            }
            _ => Err(DcaError::InvalidParameter(
                "Outcome data does not match the configured regime".to_string(),
            )),
        }
    }

    /// Rows for one predictor across all thresholds, on its complete-case
    /// subset, in parallel.
    fn predictor_rows(
        &self,
        predictor: &Predictor,
        cohort: &Cohort,
        grid: &ThresholdGrid,
        all_fractions: &RiskFractions,
    ) -> Result<Vec<DcaRow>> {
        let scores = normalize_scores(predictor)?;
        let mask = predictor.observed_indices();
        let masked_scores: Vec<f64> = mask.iter().map(|&i| scores[i]).collect();
        let masked = MaskedOutcome::build(
            &self.regime,
            cohort.outcome(),
            self.subject_risk.as_deref(),
            &mask,
        )?;
        let estimator = masked.estimator();
        let harm = self.harm.get(&predictor.name);
        let m = mask.len();

        let mut rows: Vec<DcaRow> = grid
            .thresholds()
            .par_iter()
            .map(|&pt| {
                let labels = would_act(&masked_scores, predictor.kind, pt);
                let fractions = estimator.estimate(&labels)?;
                let nb = net_benefit(&fractions, pt, harm);
                let nb_all = net_benefit(all_fractions, pt, 0.0);
                Ok(DcaRow {
                    strategy: predictor.name.clone(),
                    threshold: pt,
                    n: m,
                    tp_est: fractions.tp * m as f64,
                    fp_est: fractions.fp * m as f64,
                    net_benefit: nb,
                    net_intervention_avoided: net_intervention_avoided(nb, nb_all, pt),
                    harm,
                    extrapolated: fractions.extrapolated,
                    smoothed_net_benefit: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(config) = &self.smooth {
            let nb_series: Vec<f64> = rows.iter().map(|r| r.net_benefit).collect();
            let smoothed = smooth_loess(grid.thresholds(), &nb_series, config)?;
            for (row, value) in rows.iter_mut().zip(smoothed) {
                row.smoothed_net_benefit = Some(value);
            }
        }

        Ok(rows)
    }
}

/// Rows for the two reference strategies, treat-all first.
fn reference_rows(
    all_fractions: &RiskFractions,
    grid: &ThresholdGrid,
    n: usize,
) -> Vec<DcaRow> {
    let mut rows = Vec::with_capacity(2 * grid.len());
    for &pt in grid.thresholds() {
        let nb_all = net_benefit(all_fractions, pt, 0.0);
        rows.push(DcaRow {
            strategy: TREAT_ALL.to_string(),
            threshold: pt,
            n,
            tp_est: all_fractions.tp * n as f64,
            fp_est: all_fractions.fp * n as f64,
            net_benefit: nb_all,
            net_intervention_avoided: 0.0,
            harm: 0.0,
            extrapolated: all_fractions.extrapolated,
            smoothed_net_benefit: None,
        });
    }
    for &pt in grid.thresholds() {
        let nb_all = net_benefit(all_fractions, pt, 0.0);
        rows.push(DcaRow {
            strategy: TREAT_NONE.to_string(),
            threshold: pt,
            n,
            tp_est: 0.0,
            fp_est: 0.0,
            net_benefit: 0.0,
            net_intervention_avoided: net_intervention_avoided(0.0, nb_all, pt),
            harm: 0.0,
            extrapolated: false,
            smoothed_net_benefit: None,
        });
    }
    rows
}

/// Outcome data restricted to one predictor's complete cases, together with
/// the regime parameters needed to drive the estimator.
#[derive(Debug)]
enum MaskedOutcome {
    Binary {
        outcomes: Vec<bool>,
    },
    Survival {
        times: Vec<f64>,
        events: Vec<u32>,
        time_horizon: f64,
        competing: bool,
        risk: Option<Vec<f64>>,
    },
    CaseControl {
        cases: Vec<bool>,
        prevalence: f64,
    },
}

impl MaskedOutcome {
    fn build(
        regime: &Regime,
        outcome: &OutcomeData,
        subject_risk: Option<&[f64]>,
        mask: &[usize],
    ) -> Result<Self> {
        match (regime, outcome) {
            (Regime::Binary, OutcomeData::Binary(outcomes)) => Ok(Self::Binary {
                outcomes: mask.iter().map(|&i| outcomes[i]).collect(),
            }),
            (
                Regime::Survival {
                    time_horizon,
                    competing,
                },
                OutcomeData::Survival { times, events },
            ) => Ok(Self::Survival {
                times: mask.iter().map(|&i| times[i]).collect(),
                events: mask.iter().map(|&i| events[i]).collect(),
                time_horizon: *time_horizon,
                competing: *competing,
                risk: subject_risk.map(|r| mask.iter().map(|&i| r[i]).collect()),
            }),
            (Regime::CaseControl { prevalence }, OutcomeData::CaseControl(cases)) => {
                Ok(Self::CaseControl {
                    cases: mask.iter().map(|&i| cases[i]).collect(),
                    prevalence: *prevalence,
                })
            }
            _ => Err(DcaError::InvalidParameter(
                "Outcome data does not match the configured regime".to_string(),
            )),
        }
    }

    fn estimator(&self) -> Estimator<'_> {
        match self {
            Self::Binary { outcomes } => Estimator::Binary { outcomes },
            Self::Survival {
                times,
                events,
                time_horizon,
                competing,
                risk,
            } => Estimator::Survival {
                times,
                events,
                time_horizon: *time_horizon,
                competing: *competing,
                subject_risk: risk.as_deref(),
            },
            Self::CaseControl { cases, prevalence } => Estimator::CaseControl {
                cases,
                prevalence: *prevalence,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn binary_cohort() -> Cohort {
        // 10 subjects, prevalence 0.3.
        let outcomes = vec![
            true, true, true, false, false, false, false, false, false, false,
        ];
        let scores = vec![0.9, 0.8, 0.4, 0.6, 0.3, 0.2, 0.1, 0.1, 0.1, 0.1];
        Cohort::new(OutcomeData::Binary(outcomes))
            .unwrap()
            .with_predictor(Predictor::probability("model", scores))
            .unwrap()
    }

    #[test]
    fn test_run_includes_references() {
        let grid = ThresholdGrid::new(vec![0.1, 0.2, 0.5]).unwrap();
        let output = DcaAnalysis::binary()
            .with_thresholds(grid)
            .run(&binary_cohort())
            .unwrap();
        assert!(output.skipped.is_empty());
        assert_eq!(
            output.table.strategies(),
            vec![TREAT_ALL, TREAT_NONE, "model"]
        );
        assert_eq!(output.table.len(), 9);
    }

    #[test]
    fn test_treat_none_is_zero() {
        let output = DcaAnalysis::binary().run(&binary_cohort()).unwrap();
        for row in output.table.for_strategy(TREAT_NONE) {
            assert_eq!(row.net_benefit, 0.0);
        }
    }

    #[test]
    fn test_treat_all_closed_form() {
        let output = DcaAnalysis::binary().run(&binary_cohort()).unwrap();
        for row in output.table.for_strategy(TREAT_ALL) {
            let odds = row.threshold / (1.0 - row.threshold);
            assert_relative_eq!(
                row.net_benefit,
                0.3 - 0.7 * odds,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_skipped_predictor_does_not_abort_run() {
        let outcomes = vec![true, false, true, false];
        let cohort = Cohort::new(OutcomeData::Binary(outcomes))
            .unwrap()
            .with_predictor(Predictor::probability("good", vec![0.9, 0.1, 0.8, 0.2]))
            .unwrap()
            .with_predictor(Predictor::raw("constant", vec![5.0, 5.0, 5.0, 5.0]))
            .unwrap();
        let grid = ThresholdGrid::new(vec![0.5]).unwrap();
        let output = DcaAnalysis::binary()
            .with_thresholds(grid)
            .run(&cohort)
            .unwrap();
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].name, "constant");
        assert!(output.table.for_strategy("good").len() == 1);
        assert!(output.table.for_strategy("constant").is_empty());
    }

    #[test]
    fn test_regime_outcome_mismatch() {
        let cohort = Cohort::new(OutcomeData::Binary(vec![true, false])).unwrap();
        assert!(DcaAnalysis::survival(1.0).run(&cohort).is_err());
    }

    #[test]
    fn test_missing_scores_shrink_n() {
        let outcomes = vec![true, false, true, false];
        let cohort = Cohort::new(OutcomeData::Binary(outcomes))
            .unwrap()
            .with_predictor(Predictor::probability(
                "partial",
                vec![0.9, f64::NAN, 0.8, 0.2],
            ))
            .unwrap();
        let grid = ThresholdGrid::new(vec![0.5]).unwrap();
        let output = DcaAnalysis::binary()
            .with_thresholds(grid)
            .run(&cohort)
            .unwrap();
        let rows = output.table.for_strategy("partial");
        assert_eq!(rows[0].n, 3);
        // References still use the full cohort.
        assert_eq!(output.table.for_strategy(TREAT_ALL)[0].n, 4);
    }

    #[test]
    fn test_smoothing_annotates_predictors_only() {
        let output = DcaAnalysis::binary()
            .with_smoothing(SmoothConfig::default())
            .run(&binary_cohort())
            .unwrap();
        for row in output.table.for_strategy("model") {
            assert!(row.smoothed_net_benefit.is_some());
        }
        for row in output.table.for_strategy(TREAT_ALL) {
            assert!(row.smoothed_net_benefit.is_none());
        }
    }

    #[test]
    fn test_harm_lowers_net_benefit() {
        let grid = ThresholdGrid::new(vec![0.2, 0.5]).unwrap();
        let cohort = binary_cohort();
        let plain = DcaAnalysis::binary()
            .with_thresholds(grid.clone())
            .run(&cohort)
            .unwrap();
        let harmed = DcaAnalysis::binary()
            .with_thresholds(grid)
            .with_harm("model", 0.02)
            .unwrap()
            .run(&cohort)
            .unwrap();
        for (a, b) in plain
            .table
            .for_strategy("model")
            .iter()
            .zip(harmed.table.for_strategy("model"))
        {
            assert_relative_eq!(a.net_benefit - b.net_benefit, 0.02, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_survival_run() {
        let cohort = Cohort::new(OutcomeData::Survival {
            times: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            events: vec![1, 1, 0, 1, 0, 0],
        })
        .unwrap()
        .with_predictor(Predictor::probability(
            "model",
            vec![0.9, 0.8, 0.7, 0.3, 0.2, 0.1],
        ))
        .unwrap();
        let grid = ThresholdGrid::new(vec![0.25, 0.5]).unwrap();
        let output = DcaAnalysis::survival(4.0)
            .with_thresholds(grid)
            .run(&cohort)
            .unwrap();
        assert!(output.skipped.is_empty());
        assert_eq!(output.table.for_strategy("model").len(), 2);
    }

    #[test]
    fn test_survival_horizon_beyond_followup_aborts() {
        let cohort = Cohort::new(OutcomeData::Survival {
            times: vec![1.0, 2.0],
            events: vec![1, 0],
        })
        .unwrap();
        assert!(matches!(
            DcaAnalysis::survival(10.0).run(&cohort),
            Err(DcaError::InvalidTimeHorizon(_))
        ));
    }

    #[test]
    fn test_config_roundtrip() {
        let analysis = DcaAnalysis::survival(5.0)
            .competing_risks(true)
            .with_thresholds(ThresholdGrid::new(vec![0.1, 0.2]).unwrap())
            .with_harm("marker", 0.01)
            .unwrap()
            .with_smoothing(SmoothConfig::default());
        let yaml = analysis.config().to_yaml().unwrap();
        let restored = DcaAnalysis::from_config(&DcaConfig::from_yaml(&yaml).unwrap()).unwrap();
        assert_eq!(restored.regime, analysis.regime);
        assert_eq!(
            restored.config().thresholds,
            analysis.config().thresholds
        );
        assert_relative_eq!(restored.harm.get("marker"), 0.01);
    }

    #[test]
    fn test_config_missing_prevalence() {
        let yaml = "regime:\n  kind: case-control\n";
        let config = DcaConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            DcaAnalysis::from_config(&config),
            Err(DcaError::MissingPrevalence)
        ));
    }

    #[test]
    fn test_config_missing_horizon() {
        let yaml = "regime:\n  kind: survival\n";
        let config = DcaConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            DcaAnalysis::from_config(&config),
            Err(DcaError::InvalidTimeHorizon(_))
        ));
    }
}
