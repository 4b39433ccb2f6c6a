use crate::mapper::{ColumnLayout, LeadField};
use crate::{IngestError, IngestResult};
use csv_async::{AsyncReaderBuilder, ByteRecord};
use serde::Serialize;
use tokio::io::AsyncRead;

/// What a lead file looks like before it is parsed for upload.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    /// Data rows, header and blank lines excluded.
    pub row_count: usize,
    /// Data rows with something in both the name and phone columns.
    pub candidate_rows: usize,
    pub headers: Vec<String>,
    pub layout: ColumnLayout,
}

/// Stream a sheet once: read the header, check that name and phone columns
/// exist, and count rows.
pub async fn inspect_lead_source<R>(reader: R) -> IngestResult<SourceSummary>
where
    R: AsyncRead + Unpin + Send,
{
    let mut rdr = AsyncReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .buffer_capacity(1 << 16)
        .create_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .await?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();
    let layout = ColumnLayout::from_headers(&headers);

    let required = [LeadField::ClientName, LeadField::ClientPhone];
    let required_indices = required
        .iter()
        .map(|field| {
            layout
                .columns()
                .iter()
                .rposition(|col| col == &Some(*field))
                .ok_or_else(|| IngestError::MissingHeader(field.column_name().to_string()))
        })
        .collect::<IngestResult<Vec<_>>>()?;

    let mut row_count = 0usize;
    let mut candidate_rows = 0usize;
    let mut record = ByteRecord::new();

    while rdr.read_byte_record(&mut record).await? {
        row_count += 1;
        let complete = required_indices.iter().all(|&idx| {
            record
                .get(idx)
                .is_some_and(|field| field.iter().any(|b| !b.is_ascii_whitespace()))
        });
        if complete {
            candidate_rows += 1;
        }
    }

    Ok(SourceSummary {
        row_count,
        candidate_rows,
        headers,
        layout,
    })
}
