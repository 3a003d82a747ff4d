//! Format pipeline
//!
//! Drives one conversion: dictionary parse, instrument resolution,
//! aggregation and assembly. [`format_tables`] works purely in memory;
//! [`run_format`] adds file I/O around it. Either the whole run succeeds
//! and one table is written, or nothing is written.

use crate::aggregator::{Aggregator, TieBreak};
use crate::assembler::{OutputAssembler, VariableColumn, WideTable};
use crate::dates::DateNormalizer;
use crate::dictionary::DataDictionary;
use crate::matcher::{AliasTable, InstrumentMatcher, MatchResolution};
use crate::records::{LongTable, VisitLabelMap};
use crate::types::ScoreKind;
use nihtb_common::{Error, Result, Table};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Run-wide settings for a conversion
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub tie_break: TieBreak,
    pub aliases: AliasTable,
    pub visit_labels: VisitLabelMap,
    pub dates: DateNormalizer,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default(),
            aliases: AliasTable::builtin(),
            visit_labels: VisitLabelMap::builtin(),
            dates: DateNormalizer::default(),
        }
    }
}

/// Per-variable line of the match report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableSummary {
    pub variable: String,
    pub instrument_key: String,
    pub score_kind: ScoreKind,
    pub resolved: bool,
    /// Rows with a value for this variable
    pub filled: usize,
}

/// What the run resolved, for auditing
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    pub dictionary_variables: usize,
    pub discarded_definitions: usize,
    pub duplicate_variables: Vec<String>,
    pub instruments: BTreeMap<String, MatchResolution>,
    pub unresolved: Vec<String>,
    pub variables: Vec<VariableSummary>,
    pub output_rows: usize,
    pub date_grouping: bool,
}

/// Result of a conversion
#[derive(Debug, Clone)]
pub struct FormatOutcome {
    pub table: WideTable,
    pub report: MatchReport,
}

/// Convert a long export table into the wide dictionary layout
pub fn format_tables(
    export: &Table,
    dictionary: &Table,
    options: &FormatOptions,
) -> Result<FormatOutcome> {
    let dictionary = DataDictionary::from_table(dictionary)?;
    let long = LongTable::from_table(export, &options.dates, &options.visit_labels)?;
    info!(
        variables = dictionary.specs.len(),
        discarded = dictionary.discarded,
        records = long.records.len(),
        "Inputs parsed"
    );

    let mut matcher = InstrumentMatcher::new(long.instrument_labels(), options.aliases.clone());
    let aggregator = Aggregator::new(&long, options.tie_break);
    let mut assembler = OutputAssembler::new(long.date_grouping(), aggregator.visit_labels());

    let mut variables = Vec::with_capacity(dictionary.specs.len());
    for spec in &dictionary.specs {
        let labels = matcher.resolve(&spec.instrument_key).labels();
        let resolved = labels.is_some();
        let series = labels
            .filter(|_| long.has_score_column(spec.score_kind))
            .map(|labels| aggregator.aggregate(labels, spec.score_kind));

        variables.push(VariableSummary {
            variable: spec.target_variable.clone(),
            instrument_key: spec.instrument_key.clone(),
            score_kind: spec.score_kind,
            resolved,
            filled: series
                .as_ref()
                .map_or(0, |s| s.values().filter(|v| v.is_some()).count()),
        });
        assembler.push(VariableColumn {
            name: spec.target_variable.clone(),
            series,
        });
    }

    let table = assembler.assemble();

    let instruments: BTreeMap<String, MatchResolution> = matcher
        .resolutions()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let unresolved: Vec<String> = instruments
        .iter()
        .filter(|(_, r)| !r.is_resolved())
        .map(|(k, _)| k.clone())
        .collect();
    if !unresolved.is_empty() {
        warn!(count = unresolved.len(), "Instrument keys left unresolved; their columns are blank");
    }

    let report = MatchReport {
        dictionary_variables: dictionary.variable_count(),
        discarded_definitions: dictionary.discarded,
        duplicate_variables: dictionary.duplicates,
        instruments,
        unresolved,
        variables,
        output_rows: table.len(),
        date_grouping: long.date_grouping(),
    };

    Ok(FormatOutcome { table, report })
}

/// Read both inputs, convert, and write the output (and optional report)
pub fn run_format(
    input: &Path,
    dictionary: &Path,
    output: &Path,
    report_path: Option<&Path>,
    options: &FormatOptions,
) -> Result<MatchReport> {
    let start = Instant::now();

    for path in [input, dictionary] {
        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
    }

    info!("Loading scores from {}", input.display());
    let export = Table::read_csv(input)?;
    info!("Loading dictionary from {}", dictionary.display());
    let dictionary = Table::read_csv(dictionary)?;

    let FormatOutcome { table, report } = format_tables(&export, &dictionary, options)?;
    let (rows, columns) = (table.len(), table.headers.len());
    table.into_table()?.write_csv(output)?;

    if let Some(path) = report_path {
        write_report(&report, path)?;
    }

    info!(
        rows,
        columns,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Saved formatted data to {}",
        output.display()
    );
    Ok(report)
}

fn write_report(report: &MatchReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| Error::Internal(format!("Report serialization failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json)?;
    info!("Wrote match report to {}", path.display());
    Ok(())
}
