use crate::lead::{LeadRecord, Platform, Stage};
use crate::mapper::LeadField;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};

// name, phone, phone2, phone3, email, job title, platform, stage
const SAMPLE_ROWS: [[&str; 8]; 6] = [
    ["Ahmed Mohamed Hassan", "+201012345678", "+201012345679", "", "ahmed.hassan@example.com", "Sales Manager", "Facebook", "New Lead"],
    ["Fatma Ali Ibrahim", "+201123456789", "", "+201123456780", "fatma.ali@example.com", "Marketing Director", "Google", "Potential"],
    ["Omar Mahmoud Ahmed", "+201234567890", "+201234567891", "", "omar.mahmoud@example.com", "Business Owner", "TikTok", "Hot Case"],
    ["Sarah Khaled Mohamed", "+201098765432", "", "", "sarah.khaled@example.com", "Real Estate Agent", "Facebook", "Meeting Done"],
    ["Nour Hassan Ibrahim", "+201276543210", "", "", "", "Property Developer, Owner", "Other", "Call Back"],
    ["Karim Tarek Ali", "+201187654321", "+201187654322", "+201187654323", "karim.tarek@example.com", "", "Google", "Whatsapp"],
];

/// Example sheet in the exact format [`crate::parse_csv`] accepts: UTF-8 with
/// a BOM, the canonical header row, then fully quoted sample rows.
pub fn generate_template() -> String {
    let header = LeadField::POSITIONAL.map(LeadField::column_name).join(",");
    let mut out = String::from('\u{feff}');
    out.push_str(&header);
    for row in SAMPLE_ROWS {
        out.push('\n');
        let quoted: Vec<String> = row.iter().map(|cell| format!("\"{cell}\"")).collect();
        out.push_str(&quoted.join(","));
    }
    out
}

/// The records encoded by [`generate_template`], in row order.
pub fn template_records() -> Vec<LeadRecord> {
    SAMPLE_ROWS
        .iter()
        .map(|row| {
            let [name, phone, phone2, phone3, email, job, platform, stage] = *row;
            let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
            LeadRecord {
                client_name: name.to_string(),
                client_phone: phone.to_string(),
                client_phone2: opt(phone2),
                client_phone3: opt(phone3),
                client_email: opt(email),
                client_job_title: opt(job),
                platform: Platform::recognize(platform).unwrap_or(Platform::Other),
                stage: Stage::recognize(stage).unwrap_or(Stage::NewLead),
            }
        })
        .collect()
}

pub fn template_file_name(date: NaiveDate) -> String {
    format!("SaleMate_Leads_Template_{}.csv", date.format("%Y-%m-%d"))
}

/// Save the template into `dir` under today's (UTC) file name.
pub async fn write_template(dir: &Path) -> std::io::Result<PathBuf> {
    let path = dir.join(template_file_name(Utc::now().date_naive()));
    tokio::fs::write(&path, generate_template()).await?;
    tracing::info!(path = %path.display(), "wrote lead template");
    Ok(path)
}
