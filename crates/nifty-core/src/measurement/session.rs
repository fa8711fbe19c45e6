use super::fit::FitAccumulator;
use super::record::{FeatureRecord, MeasurementRecord, RecordBook};
use super::width::{FeatureMeasurement, measure_feature};
use crate::domain::{EngineError, EngineResult};
use crate::numerics::{LinearFit, index_span};
use crate::spectrum::SpectrumModel;
use std::collections::BTreeMap;

/// Result of handing persisted records to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    Restored { features: usize },
    /// The loaded records did not fit the feature list and were dropped;
    /// the session now holds empty records.
    Discarded { reason: EngineError },
}

impl RestoreOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored { .. })
    }
}

/// Continuum fit and measurement records for the features of one model.
///
/// Operations act on the feature currently selected in the model passed in.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSession {
    fit: FitAccumulator,
    records: RecordBook,
}

impl MeasurementSession {
    pub fn new(model: &SpectrumModel) -> Self {
        Self {
            fit: FitAccumulator::default(),
            records: RecordBook::empty_for(model.features(), model.config().key_decimals),
        }
    }

    pub fn fit(&self) -> &FitAccumulator {
        &self.fit
    }

    pub fn records(&self) -> &RecordBook {
        &self.records
    }

    pub fn active_record(&self, model: &SpectrumModel) -> Option<&MeasurementRecord> {
        self.records
            .get(model.selection())
            .map(|entry| &entry.record)
    }

    fn active_entry_mut(&mut self, model: &SpectrumModel) -> EngineResult<&mut FeatureRecord> {
        let selection = model.selection();
        let available = self.records.len();
        self.records.get_mut(selection).ok_or_else(|| {
            EngineError::invalid_input(format!(
                "selection {selection} has no record, session holds {available}"
            ))
        })
    }

    /// Rejects a model whose sample count differs from the one the fit was
    /// built on.
    fn ensure_fit_matches(&self, model: &SpectrumModel) -> EngineResult<()> {
        let samples = model.wavelength().len();
        let beyond = self.fit.indices().last().is_some_and(|last| *last >= samples);
        let fitted = self.fit.normalized().len();
        if beyond || (self.fit.has_fit() && fitted != samples) {
            return Err(EngineError::invalid_input(format!(
                "continuum fit belongs to a spectrum of {fitted} samples, model has {samples}"
            )));
        }
        Ok(())
    }

    /// Adds the samples inside `[min, max]` to the continuum and refits.
    pub fn add_fit_points(
        &mut self,
        model: &SpectrumModel,
        min: f64,
        max: f64,
    ) -> EngineResult<LinearFit> {
        self.ensure_fit_matches(model)?;
        let span = index_span(model.wavelength(), min, max)
            .ok_or_else(|| EngineError::invalid_input("test spectrum is empty"))?;
        let fit = self.fit.extend(span, model.wavelength(), model.flux())?;
        tracing::debug!(
            slope = fit.slope,
            intercept = fit.intercept,
            points = self.fit.indices().len(),
            "continuum refitted"
        );
        Ok(fit)
    }

    /// Refits the accumulated points against the current working arrays.
    /// `None` when no points have been picked.
    pub fn refit(&mut self, model: &SpectrumModel) -> EngineResult<Option<LinearFit>> {
        if self.fit.indices().is_empty() {
            return Ok(None);
        }
        self.ensure_fit_matches(model)?;
        self.fit
            .refit(model.wavelength(), model.flux())
            .map(Some)
    }

    pub fn reset_fit(&mut self) {
        self.fit.reset();
    }

    pub fn measure_equivalent_width(
        &mut self,
        model: &SpectrumModel,
        min: f64,
        max: f64,
    ) -> EngineResult<FeatureMeasurement> {
        if !self.fit.has_fit() {
            return Err(EngineError::NoFit {
                feature: model.selected_key(),
            });
        }
        self.ensure_fit_matches(model)?;
        let span = index_span(model.wavelength(), min, max)
            .ok_or_else(|| EngineError::invalid_input("test spectrum is empty"))?;
        let measurement = measure_feature(model.wavelength(), self.fit.normalized(), span);

        let entry = self.active_entry_mut(model)?;
        if measurement.fwhm.is_none() {
            tracing::info!(feature = %entry.key, "FWHM undefined: fewer than two half-depth crossings");
        }
        entry.record.push(measurement);
        tracing::debug!(
            feature = %entry.key,
            ew = measurement.equivalent_width,
            mode = measurement.mode,
            fwhm = ?measurement.fwhm,
            "measurement recorded"
        );
        Ok(measurement)
    }

    pub fn delete_last_measurement(&mut self, model: &SpectrumModel) -> EngineResult<FeatureMeasurement> {
        let entry = self.active_entry_mut(model)?;
        entry
            .record
            .pop()
            .ok_or_else(|| EngineError::EmptyCollection {
                feature: entry.key.clone(),
            })
    }

    /// Flips the mark of the active feature and returns the new state.
    pub fn toggle_mark(&mut self, model: &SpectrumModel) -> EngineResult<bool> {
        let entry = self.active_entry_mut(model)?;
        let marked = entry.record.toggle_mark();
        tracing::info!(
            feature = %entry.key,
            "{}",
            if marked { "marked" } else { "unmarked" }
        );
        Ok(marked)
    }

    pub fn set_note(&mut self, model: &SpectrumModel, text: impl Into<String>) -> EngineResult<()> {
        self.active_entry_mut(model)?.record.set_note(text);
        Ok(())
    }

    pub fn append_note(&mut self, model: &SpectrumModel, text: &str) -> EngineResult<()> {
        self.active_entry_mut(model)?.record.append_note(text);
        Ok(())
    }

    pub fn reset_measurements(&mut self, model: &SpectrumModel) {
        self.records = RecordBook::empty_for(model.features(), model.config().key_decimals);
    }

    /// Replaces the records with persisted ones when their keys match the
    /// feature list; otherwise starts over with empty records.
    pub fn restore_records(
        &mut self,
        model: &SpectrumModel,
        loaded: BTreeMap<String, MeasurementRecord>,
    ) -> RestoreOutcome {
        match RecordBook::restore(model.features(), model.config().key_decimals, loaded) {
            Ok(book) => {
                self.records = book;
                RestoreOutcome::Restored {
                    features: self.records.len(),
                }
            }
            Err(reason) => {
                tracing::warn!(%reason, "stored measurements do not match the feature list, starting empty");
                self.reset_measurements(model);
                RestoreOutcome::Discarded { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MeasurementSession, RestoreOutcome};
    use crate::common::EngineConfig;
    use crate::domain::EngineError;
    use crate::measurement::MeasurementRecord;
    use crate::spectrum::{ModelInputs, SpectrumColumns, SpectrumModel};
    use std::collections::BTreeMap;

    fn dip_model() -> SpectrumModel {
        SpectrumModel::initialize(
            EngineConfig::default(),
            ModelInputs::new(
                SpectrumColumns::new(
                    vec![100.0, 101.0, 102.0, 103.0, 104.0],
                    vec![1.0, 1.0, 0.5, 1.0, 1.0],
                ),
                vec![102.0],
            ),
        )
        .expect("valid model")
    }

    #[test]
    fn continuum_from_two_windows_measures_dip() {
        let model = dip_model();
        let mut session = MeasurementSession::new(&model);

        session.add_fit_points(&model, 99.0, 100.5).expect("left continuum");
        session.add_fit_points(&model, 104.5, 110.0).expect("right continuum");
        assert_eq!(
            session.fit().indices().iter().copied().collect::<Vec<_>>(),
            vec![0, 1, 3, 4]
        );

        let measurement = session
            .measure_equivalent_width(&model, 101.5, 103.5)
            .expect("measurement");
        assert!((measurement.equivalent_width - 0.5).abs() < 1.0e-12);
        assert_eq!(measurement.mode, 102.0);

        let record = session.active_record(&model).expect("record");
        assert_eq!(record.len(), 1);
        assert_eq!(record.ranges(), &[[100.0, 104.0]]);
    }

    #[test]
    fn fit_from_another_spectrum_is_refused() {
        let model = dip_model();
        let mut session = MeasurementSession::new(&model);
        session.add_fit_points(&model, 99.0, 110.0).expect("fit");

        let shorter = SpectrumModel::initialize(
            EngineConfig::default(),
            ModelInputs::new(
                SpectrumColumns::new(vec![100.0, 101.0, 102.0], vec![1.0, 0.5, 1.0]),
                vec![102.0],
            ),
        )
        .expect("valid model");
        let error = session
            .measure_equivalent_width(&shorter, 100.0, 102.0)
            .expect_err("sample counts differ");
        assert!(matches!(error, EngineError::InvalidInput { .. }));
        assert!(session.refit(&shorter).is_err());
        assert!(session.active_record(&model).expect("record").is_empty());
    }

    #[test]
    fn measuring_without_fit_fails_and_records_nothing() {
        let model = dip_model();
        let mut session = MeasurementSession::new(&model);
        let error = session
            .measure_equivalent_width(&model, 101.0, 103.0)
            .expect_err("no fit yet");
        assert_eq!(
            error,
            EngineError::NoFit {
                feature: "102.0".to_string()
            }
        );
        assert!(session.active_record(&model).expect("record").is_empty());
    }

    #[test]
    fn undo_restores_previous_record() {
        let model = dip_model();
        let mut session = MeasurementSession::new(&model);
        session.add_fit_points(&model, 99.0, 110.0).expect("fit");
        let before = session.clone();

        session
            .measure_equivalent_width(&model, 101.0, 103.0)
            .expect("measurement");
        session.delete_last_measurement(&model).expect("undo");
        assert_eq!(session, before);

        let error = session
            .delete_last_measurement(&model)
            .expect_err("nothing left");
        assert!(matches!(error, EngineError::EmptyCollection { .. }));
    }

    #[test]
    fn failed_fit_keeps_earlier_points() {
        let model = dip_model();
        let mut session = MeasurementSession::new(&model);
        let error = session
            .add_fit_points(&model, 99.0, 99.5)
            .expect_err("single sample");
        assert_eq!(error, EngineError::UnderdeterminedFit { distinct: 1 });
        assert!(session.fit().indices().is_empty());

        session.add_fit_points(&model, 99.0, 100.5).expect("two samples");
        let before = session.fit().clone();
        session.add_fit_points(&model, 99.0, 100.5).expect("same window again");
        assert_eq!(session.fit(), &before);
    }

    #[test]
    fn mismatched_restore_starts_empty() {
        let model = dip_model();
        let mut session = MeasurementSession::new(&model);
        session.set_note(&model, "draft").expect("note");

        let mut loaded = BTreeMap::new();
        loaded.insert("5780.48".to_string(), MeasurementRecord::default());
        let outcome = session.restore_records(&model, loaded);
        assert!(matches!(outcome, RestoreOutcome::Discarded { .. }));
        assert_eq!(session.active_record(&model).expect("record").notes(), "");
    }

    #[test]
    fn marks_and_notes_target_active_feature() {
        let model = dip_model();
        let mut session = MeasurementSession::new(&model);
        assert!(session.toggle_mark(&model).expect("mark"));
        session.append_note(&model, "blend").expect("note");
        let record = session.active_record(&model).expect("record");
        assert!(record.is_marked());
        assert_eq!(record.notes(), "blend\n");
        assert_eq!(session.records().marked_count(), 1);
    }
}
