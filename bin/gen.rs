use clap::{Arg, Command};
use lead_ingest::{LeadField, Platform, Stage};
use std::io::{self, Write};

const FIRST: [&str; 8] = ["Ahmed", "Fatma", "Omar", "Sarah", "Nour", "Karim", "Aya", "Youssef"];
const LAST: [&str; 6] = ["Hassan", "Ibrahim", "Mahmoud", "Khaled", "Tarek", "Ali"];
const JOBS: [&str; 5] = ["Engineer", "Doctor", "Accountant", "Architect", "Business Owner, Retail"];

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic lead sheet to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("with_header")
                .long("with-header")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("invalid_every")
                .long("invalid-every")
                .help("Blank out the phone on every Nth row")
                .value_parser(clap::value_parser!(u64)),
        )
        .get_matches();

    let rows: u64 = matches.get_one::<u64>("rows").copied().unwrap_or_default();
    let with_header = matches.get_flag("with_header");
    let invalid_every = matches.get_one::<u64>("invalid_every").copied().filter(|n| *n > 0);

    let mut out = io::BufWriter::new(io::stdout().lock());

    if with_header {
        let header = LeadField::POSITIONAL.map(LeadField::column_name).join(",");
        writeln!(&mut out, "{header}")?;
    }

    // Deterministic: row i always produces the same lead.
    for i in 0..rows {
        let idx = i as usize;
        let name = format!("{} {}", FIRST[idx % FIRST.len()], LAST[idx % LAST.len()]);
        let phone = if invalid_every.is_some_and(|n| (i + 1) % n == 0) {
            String::new()
        } else {
            format!("+2010{:08}", i)
        };
        let phone2 = if i % 3 == 0 {
            format!("+2011{:08}", i)
        } else {
            String::new()
        };
        let email = format!("lead{i}@example.com");
        let job = JOBS[idx % JOBS.len()];
        let platform = Platform::ALL[idx % Platform::ALL.len()];
        let stage = Stage::ALL[idx % Stage::ALL.len()];
        writeln!(
            &mut out,
            "\"{name}\",\"{phone}\",\"{phone2}\",\"\",\"{email}\",\"{job}\",\"{platform}\",\"{stage}\""
        )?;
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
