use crate::lead::{LeadRecord, Platform, Stage};
use crate::mapper::{ColumnLayout, PartialLead};
use crate::row::split_row;
use serde::Serialize;
use thiserror::Error;

const DELIMITER: char = ',';
const BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("CSV file must contain headers and at least one data row")]
    TooFewLines,
}

/// How column positions are turned into lead fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Uploaded sheet: the first line is a header row matched by name.
    #[default]
    NamedHeader,
    /// Bulk paste in fixed column order. A first line mentioning
    /// `client_name` is taken as a header and skipped.
    Positional,
}

impl ParseMode {
    /// Platform used when the cell is empty or unrecognized.
    pub fn default_platform(self) -> Platform {
        match self {
            ParseMode::NamedHeader => Platform::Other,
            ParseMode::Positional => Platform::Facebook,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingName,
    MissingPhone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based line number in the original text.
    pub line: usize,
    pub reason: SkipReason,
}

/// Parsed records in input order, plus the rows that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseOutcome {
    pub records: Vec<LeadRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Parse an uploaded lead sheet (header row required) into records.
pub fn parse_csv(text: &str) -> Result<Vec<LeadRecord>, ParseError> {
    parse_leads(text, ParseMode::NamedHeader).map(|outcome| outcome.records)
}

pub fn parse_leads(text: &str, mode: ParseMode) -> Result<ParseOutcome, ParseError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let (layout, body) = match mode {
        ParseMode::NamedHeader => {
            if lines.len() < 2 {
                return Err(ParseError::TooFewLines);
            }
            let headers = split_row(lines[0].1, DELIMITER);
            (ColumnLayout::from_headers(&headers), &lines[1..])
        }
        ParseMode::Positional => {
            let has_header = lines
                .first()
                .is_some_and(|(_, line)| line.to_lowercase().contains("client_name"));
            let body = if has_header { &lines[1..] } else { &lines[..] };
            (ColumnLayout::positional(), body)
        }
    };

    let mut outcome = ParseOutcome::default();
    for &(line_no, line) in body {
        let cells = split_row(line, DELIMITER);
        match finish_lead(layout.map_row(&cells), mode) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => outcome.skipped.push(SkippedRow {
                line: line_no,
                reason,
            }),
        }
    }

    if !outcome.skipped.is_empty() {
        tracing::debug!(
            kept = outcome.records.len(),
            skipped = outcome.skipped.len(),
            "dropped rows without name or phone"
        );
    }
    Ok(outcome)
}

fn finish_lead(partial: PartialLead, mode: ParseMode) -> Result<LeadRecord, SkipReason> {
    let name = partial.client_name.trim();
    let phone = partial.client_phone.trim();
    if name.is_empty() {
        return Err(SkipReason::MissingName);
    }
    if phone.is_empty() {
        return Err(SkipReason::MissingPhone);
    }

    Ok(LeadRecord {
        client_name: name.to_string(),
        client_phone: phone.to_string(),
        client_phone2: non_empty(&partial.client_phone2),
        client_phone3: non_empty(&partial.client_phone3),
        client_email: non_empty(&partial.client_email),
        client_job_title: non_empty(&partial.client_job_title),
        platform: Platform::recognize(&partial.platform).unwrap_or(mode.default_platform()),
        stage: Stage::recognize(&partial.stage).unwrap_or(Stage::NewLead),
    })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
