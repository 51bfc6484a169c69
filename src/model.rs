//! Valuation model: runs the full pipeline over explicit inputs
//!
//! Historical analysis -> projections -> {DCF, multiples} -> summary. Every
//! stage takes its predecessor's output as an argument; the model itself only
//! owns the immutable inputs and configuration.

use crate::config::{DataPaths, ModelConfig};
use crate::data;
use crate::dcf::{self, DcfResult, SensitivityGrid};
use crate::error::{Result, ValuationError};
use crate::historical::{self, HistoricalAnalysis};
use crate::multiples::{self, MultiplesResult};
use crate::params::{Parameters, ValuationParameters};
use crate::projection::Projector;
use crate::summary::{self, ValuationSummary};
use crate::types::{ComparableCompany, HistoricalRecord, ProjectionRecord};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The three input tables
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationInputs {
    pub historical: Vec<HistoricalRecord>,
    pub comparables: Vec<ComparableCompany>,
    pub parameters: Parameters,
}

impl ValuationInputs {
    pub fn new(
        historical: Vec<HistoricalRecord>,
        comparables: Vec<ComparableCompany>,
        parameters: Parameters,
    ) -> Self {
        Self {
            historical,
            comparables,
            parameters,
        }
    }

    /// Load the default-named tables from `dir`
    pub fn load_dir(dir: &Path) -> Result<Self> {
        Self::load(&DataPaths::in_dir(dir))
    }

    pub fn load(paths: &DataPaths) -> Result<Self> {
        let (historical, comparables, parameters) = data::load_all(paths)?;
        Ok(Self::new(historical, comparables, parameters))
    }

    /// Most recent historical period
    pub fn last_record(&self) -> Result<&HistoricalRecord> {
        self.historical
            .last()
            .ok_or_else(|| ValuationError::MissingInput("historical financial records".to_string()))
    }
}

/// Everything one pipeline run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub analysis_date: NaiveDate,
    pub parameters: ValuationParameters,
    pub historical: HistoricalAnalysis,
    pub projections: Vec<ProjectionRecord>,
    pub dcf: DcfResult,
    pub sensitivity: SensitivityGrid,
    pub multiples: MultiplesResult,
    pub summary: ValuationSummary,
}

impl ValuationReport {
    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Startup valuation model over a fixed set of inputs
#[derive(Debug, Clone)]
pub struct ValuationModel {
    inputs: ValuationInputs,
    params: ValuationParameters,
    config: ModelConfig,
    projector: Projector,
}

impl ValuationModel {
    /// Validate the parameters and configuration up front
    pub fn new(inputs: ValuationInputs, config: ModelConfig) -> Result<Self> {
        let params = inputs.parameters.validate()?;
        config.validate()?;
        let projector = Projector::new(config.schedule.clone(), config.ratios);

        Ok(Self {
            inputs,
            params,
            config,
            projector,
        })
    }

    pub fn inputs(&self) -> &ValuationInputs {
        &self.inputs
    }

    pub fn params(&self) -> &ValuationParameters {
        &self.params
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn analyze_historical(&self) -> Result<HistoricalAnalysis> {
        historical::analyze_historical(&self.inputs.historical)
    }

    /// Forecast `horizon` years past the last historical period
    pub fn project(&self, horizon: usize) -> Result<Vec<ProjectionRecord>> {
        self.projector
            .project(self.inputs.last_record()?, &self.params, horizon)
    }

    pub fn run_dcf(&self, projections: &[ProjectionRecord]) -> Result<DcfResult> {
        dcf::run_dcf(projections, &self.params)
    }

    pub fn sensitivity(&self, projections: &[ProjectionRecord]) -> Result<SensitivityGrid> {
        dcf::sensitivity(projections, &self.params, &self.config.sensitivity)
    }

    /// Multiples on the last historical and first projected period
    pub fn run_multiples(&self, projections: &[ProjectionRecord]) -> Result<MultiplesResult> {
        let current = self.inputs.last_record()?.metrics();
        let forward = projections
            .first()
            .ok_or_else(|| ValuationError::invalid("multiples", "no projected period for forward metrics"))?
            .metrics();
        multiples::run_multiples(&current, &forward, &self.inputs.comparables)
    }

    pub fn summarize(&self, dcf: &DcfResult, multiples: &MultiplesResult) -> Result<ValuationSummary> {
        summary::summarize(dcf, multiples)
    }

    /// Run every stage with the configured horizon
    pub fn run(&self) -> Result<ValuationReport> {
        let historical = self.analyze_historical()?;
        let projections = self.project(self.config.horizon)?;
        let dcf = self.run_dcf(&projections)?;
        let sensitivity = self.sensitivity(&projections)?;
        let multiples = self.run_multiples(&projections)?;
        let summary = self.summarize(&dcf, &multiples)?;

        Ok(ValuationReport {
            analysis_date: Utc::now().date_naive(),
            parameters: self.params,
            historical,
            projections,
            dcf,
            sensitivity,
            multiples,
            summary,
        })
    }
}
