use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;

use crate::app::FetchReport;
use crate::domain::PdbId;
use crate::error::KiraError;
use crate::pipeline::BatchReport;
use crate::store::Store;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Plain,
    Json,
}

pub struct ReportOutput;

impl ReportOutput {
    pub fn print_batch(report: &BatchReport, mode: OutputMode) -> io::Result<()> {
        match mode {
            OutputMode::Json => Self::print_json(report),
            OutputMode::Plain => {
                let mut stdout = io::stdout();
                writeln!(stdout, "Original number of PDBs: {}", report.input)?;
                writeln!(stdout, "Final number of PDBs: {}", report.accepted.len())
            }
        }
    }

    pub fn print_fetch(report: &FetchReport, mode: OutputMode) -> io::Result<()> {
        match mode {
            OutputMode::Json => Self::print_json(report),
            OutputMode::Plain => {
                let mut stdout = io::stdout();
                for item in &report.items {
                    write!(stdout, "{} {}", item.action, item.target)?;
                    if let Some(resolution) = item.resolution {
                        write!(stdout, " resolution={resolution}")?;
                    }
                    if let Some(size) = item.size {
                        write!(
                            stdout,
                            " atoms={} residues={} chains={}",
                            size.atoms, size.residues, size.chains
                        )?;
                    }
                    writeln!(stdout)?;
                }
                Ok(())
            }
        }
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub fn write_id_list(path: &Utf8Path, ids: &[PdbId]) -> Result<(), KiraError> {
    let content: String = ids.iter().map(|id| format!("{id}\n")).collect();
    Store::write_bytes_atomic(path, content.as_bytes())
}
