//! CSV loaders for the historical, comparables and parameter tables

use crate::config::DataPaths;
use crate::error::{Result, ValuationError};
use crate::params::Parameters;
use crate::types::{ComparableCompany, HistoricalRecord, Stage};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read the historical financials table
/// (`Year, Revenue, COGS, EBITDA, Free_Cash_Flow`)
pub fn load_historical(path: &Path) -> Result<Vec<HistoricalRecord>> {
    read_historical(open(path, "historical financials")?)
}

/// Read the comparable companies table (`Stage, EV_Revenue, EV_EBITDA`)
pub fn load_comparables(path: &Path) -> Result<Vec<ComparableCompany>> {
    read_comparables(open(path, "comparable companies")?)
}

/// Read the parameters table (`Parameter, Value`)
pub fn load_parameters(path: &Path) -> Result<Parameters> {
    read_parameters(open(path, "valuation parameters")?)
}

pub fn read_historical<R: Read>(reader: R) -> Result<Vec<HistoricalRecord>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let year_idx = find_column(&headers, "Year", "historical")?;
    let revenue_idx = find_column(&headers, "Revenue", "historical")?;
    let cogs_idx = find_column(&headers, "COGS", "historical")?;
    let ebitda_idx = find_column(&headers, "EBITDA", "historical")?;
    let fcf_idx = find_column(&headers, "Free_Cash_Flow", "historical")?;

    let mut records = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let line = row + 2;

        let year_str = field(&record, year_idx, "Year", line)?;
        let year: i32 = year_str
            .parse()
            .map_err(|_| ValuationError::ParseError(format!("Invalid Year '{}' on line {}", year_str, line)))?;

        records.push(HistoricalRecord {
            year,
            revenue: number(&record, revenue_idx, "Revenue", line)?,
            cogs: number(&record, cogs_idx, "COGS", line)?,
            ebitda: number(&record, ebitda_idx, "EBITDA", line)?,
            free_cash_flow: number(&record, fcf_idx, "Free_Cash_Flow", line)?,
        });
    }

    log::debug!("Loaded {} historical records", records.len());
    Ok(records)
}

pub fn read_comparables<R: Read>(reader: R) -> Result<Vec<ComparableCompany>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let stage_idx = find_column(&headers, "Stage", "comparables")?;
    let ev_revenue_idx = find_column(&headers, "EV_Revenue", "comparables")?;
    let ev_ebitda_idx = find_column(&headers, "EV_EBITDA", "comparables")?;
    let name_idx = headers.iter().position(|h| h.eq_ignore_ascii_case("Company"));

    let mut comparables = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let line = row + 2;

        let stage_str = field(&record, stage_idx, "Stage", line)?;
        let stage: Stage = stage_str.parse().map_err(|_| {
            ValuationError::ParseError(format!("Unknown Stage '{}' on line {}", stage_str, line))
        })?;

        let mut company = ComparableCompany::new(
            stage,
            number(&record, ev_revenue_idx, "EV_Revenue", line)?,
            number(&record, ev_ebitda_idx, "EV_EBITDA", line)?,
        );
        if let Some(name) = name_idx.and_then(|idx| record.get(idx)).filter(|n| !n.is_empty()) {
            company = company.with_name(name);
        }
        comparables.push(company);
    }

    log::debug!("Loaded {} comparable companies", comparables.len());
    Ok(comparables)
}

pub fn read_parameters<R: Read>(reader: R) -> Result<Parameters> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let name_idx = find_column(&headers, "Parameter", "parameters")?;
    let value_idx = find_column(&headers, "Value", "parameters")?;

    let mut params = Parameters::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let line = row + 2;

        let name = field(&record, name_idx, "Parameter", line)?;
        let value = number(&record, value_idx, "Value", line)?;
        params.insert(name, value);
    }

    log::debug!("Loaded {} parameters", params.len());
    Ok(params)
}

/// All three tables from the locations in `paths`
pub fn load_all(paths: &DataPaths) -> Result<(Vec<HistoricalRecord>, Vec<ComparableCompany>, Parameters)> {
    let historical = load_historical(&paths.historical_path())?;
    let comparables = load_comparables(&paths.comparables_path())?;
    let parameters = load_parameters(&paths.parameters_path())?;

    log::info!("Loaded input tables from {}", paths.dir.display());
    Ok((historical, comparables, parameters))
}

fn open(path: &Path, table: &str) -> Result<File> {
    File::open(path).map_err(|e| {
        ValuationError::MissingInput(format!("{} table at {}: {}", table, path.display(), e))
    })
}

/// Find column index by name
fn find_column(headers: &StringRecord, name: &str, table: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| ValuationError::MissingInput(format!("column '{}' in {} table", name, table)))
}

fn field<'a>(record: &'a StringRecord, idx: usize, name: &str, line: usize) -> Result<&'a str> {
    record
        .get(idx)
        .ok_or_else(|| ValuationError::ParseError(format!("Missing {} on line {}", name, line)))
}

fn number(record: &StringRecord, idx: usize, name: &str, line: usize) -> Result<f64> {
    let raw = field(record, idx, name, line)?;
    let value: f64 = raw
        .parse()
        .map_err(|_| ValuationError::ParseError(format!("Invalid {} '{}' on line {}", name, raw, line)))?;

    if !value.is_finite() {
        return Err(ValuationError::ParseError(format!(
            "Non-finite {} '{}' on line {}",
            name, raw, line
        )));
    }
    Ok(value)
}
