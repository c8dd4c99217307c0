use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Write};
use std::path::Path;
use std::sync::LazyLock;

use flate2::read::GzDecoder;
use regex::Regex;

use crate::domain::ArchiveSource;
use crate::error::KiraError;

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub hetero: bool,
    pub serial: u32,
    pub name: String,
    pub alt_loc: Option<char>,
    pub res_name: String,
    pub chain_id: String,
    pub res_seq: i32,
    pub i_code: Option<char>,
    pub position: [f64; 3],
    pub occupancy: f64,
    pub b_factor: f64,
    pub element: String,
    pub model: u32,
}

impl Atom {
    pub fn is_hydrogen(&self) -> bool {
        matches!(self.element.as_str(), "H" | "D")
            || (self.element.is_empty() && self.name.starts_with('H'))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    pub atoms: Vec<Atom>,
}

impl Structure {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn chains(&self) -> Vec<Chain<'_>> {
        segments(&self.atoms, |atom| (atom.model, atom.chain_id.as_str()))
            .into_iter()
            .map(|atoms| Chain { atoms })
            .collect()
    }

    pub fn residues(&self) -> Vec<Residue<'_>> {
        residue_segments(&self.atoms)
    }

    pub fn chain_count(&self) -> usize {
        self.chains().len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues().len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Chain<'a> {
    atoms: &'a [Atom],
}

impl<'a> Chain<'a> {
    pub fn id(&self) -> &'a str {
        self.atoms.first().map(|atom| atom.chain_id.as_str()).unwrap_or("")
    }

    pub fn residues(&self) -> Vec<Residue<'a>> {
        residue_segments(self.atoms)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Residue<'a> {
    atoms: &'a [Atom],
}

impl<'a> Residue<'a> {
    pub fn name(&self) -> &'a str {
        self.atoms.first().map(|atom| atom.res_name.as_str()).unwrap_or("")
    }

    pub fn atoms(&self) -> &'a [Atom] {
        self.atoms
    }

    pub fn atom(&self, name: &str) -> Option<&'a Atom> {
        self.atoms.iter().find(|atom| atom.name == name)
    }

    pub fn is_hetero(&self) -> bool {
        self.atoms.iter().all(|atom| atom.hetero)
    }
}

fn residue_segments(atoms: &[Atom]) -> Vec<Residue<'_>> {
    segments(atoms, |atom| {
        (
            atom.model,
            atom.chain_id.as_str(),
            atom.res_seq,
            atom.i_code,
            atom.res_name.as_str(),
        )
    })
    .into_iter()
    .map(|atoms| Residue { atoms })
    .collect()
}

fn segments<'a, K: PartialEq>(atoms: &'a [Atom], key: impl Fn(&'a Atom) -> K) -> Vec<&'a [Atom]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=atoms.len() {
        if i == atoms.len() || key(&atoms[i]) != key(&atoms[start]) {
            if i > start {
                runs.push(&atoms[start..i]);
            }
            start = i;
        }
    }
    runs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPolicy {
    All,
    First,
}

pub fn read_pdb<R: BufRead>(
    reader: R,
    policy: ModelPolicy,
    model_base: u32,
) -> Result<Vec<Atom>, String> {
    let mut atoms = Vec::new();
    let mut model = model_base;
    let mut seen_model = false;

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| err.to_string())?;
        let line_num = index + 1;

        if line.starts_with("MODEL") {
            if seen_model {
                model += 1;
            }
            seen_model = true;
            continue;
        }
        if line.starts_with("ENDMDL") && policy == ModelPolicy::First {
            break;
        }

        let hetero = line.starts_with("HETATM");
        if !(hetero || line.starts_with("ATOM  ")) {
            continue;
        }
        atoms.push(parse_atom(&line, line_num, hetero, model)?);
    }
    Ok(atoms)
}

fn parse_atom(line: &str, line_num: usize, hetero: bool, model: u32) -> Result<Atom, String> {
    let coord = |start: usize, end: usize, label: &str| -> Result<f64, String> {
        column(line, start, end)
            .parse::<f64>()
            .map_err(|_| format!("line {line_num}: invalid {label}"))
    };
    let optional = |start: usize, end: usize, default: f64| -> f64 {
        column(line, start, end).parse::<f64>().unwrap_or(default)
    };
    let single = |index: usize| -> Option<char> {
        line.get(index..index + 1)
            .and_then(|value| value.chars().next())
            .filter(|ch| *ch != ' ')
    };

    let res_seq = column(line, 22, 26)
        .parse::<i32>()
        .map_err(|_| format!("line {line_num}: invalid residue number"))?;
    let name = column(line, 12, 16).to_string();
    let mut element = column(line, 76, 78).to_ascii_uppercase();
    if element.is_empty() {
        element = name
            .chars()
            .find(|ch| ch.is_ascii_alphabetic())
            .map(|ch| ch.to_string())
            .unwrap_or_default();
    }

    Ok(Atom {
        hetero,
        serial: column(line, 6, 11).parse().unwrap_or(0),
        name,
        alt_loc: single(16),
        res_name: column(line, 17, 20).to_string(),
        chain_id: column(line, 21, 22).to_string(),
        res_seq,
        i_code: single(26),
        position: [
            coord(30, 38, "x coordinate")?,
            coord(38, 46, "y coordinate")?,
            coord(46, 54, "z coordinate")?,
        ],
        occupancy: optional(54, 60, 1.0),
        b_factor: optional(60, 66, 0.0),
        element,
        model,
    })
}

fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).map(str::trim).unwrap_or("")
}

pub fn write_pdb<W: Write>(mut out: W, structure: &Structure) -> io::Result<()> {
    let mut models: Vec<u32> = structure.atoms.iter().map(|atom| atom.model).collect();
    models.dedup();
    let multi_model = models.len() > 1;

    let mut current_model = None;
    for (index, atom) in structure.atoms.iter().enumerate() {
        if multi_model && current_model != Some(atom.model) {
            if current_model.is_some() {
                writeln!(out, "ENDMDL")?;
            }
            writeln!(out, "MODEL     {:>4}", atom.model)?;
            current_model = Some(atom.model);
        }
        write_atom(&mut out, atom, (index as u32 + 1) % 100_000)?;
    }
    if multi_model {
        writeln!(out, "ENDMDL")?;
    }
    writeln!(out, "END")
}

fn write_atom<W: Write>(out: &mut W, atom: &Atom, serial: u32) -> io::Result<()> {
    let record = if atom.hetero { "HETATM" } else { "ATOM" };
    let name = if atom.name.len() < 4 && atom.element.len() == 1 {
        format!(" {:<3}", atom.name)
    } else {
        format!("{:<4}", atom.name)
    };
    writeln!(
        out,
        "{:<6}{:>5} {}{}{:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
        record,
        serial,
        name,
        atom.alt_loc.unwrap_or(' '),
        atom.res_name,
        atom.chain_id.chars().next().unwrap_or(' '),
        atom.res_seq,
        atom.i_code.unwrap_or(' '),
        atom.position[0],
        atom.position[1],
        atom.position[2],
        atom.occupancy,
        atom.b_factor,
        atom.element,
    )
}

pub fn read_members(path: &Path) -> Result<Vec<String>, KiraError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let file = File::open(path).map_err(|err| parse_error(path, err))?;

    if name.ends_with(".tar.gz") {
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let mut members = Vec::new();
        let entries = archive.entries().map_err(|err| parse_error(path, err))?;
        for entry in entries {
            let mut entry = entry.map_err(|err| parse_error(path, err))?;
            let is_pdb = entry
                .path()
                .ok()
                .and_then(|member| member.to_str().map(|member| member.ends_with(".pdb")))
                .unwrap_or(false);
            if !is_pdb {
                continue;
            }
            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .map_err(|err| parse_error(path, err))?;
            members.push(text);
        }
        if members.is_empty() {
            return Err(parse_error(path, "bundle has no PDB members"));
        }
        return Ok(members);
    }

    let mut text = String::new();
    if name.ends_with(".gz") {
        GzDecoder::new(file)
            .read_to_string(&mut text)
            .map_err(|err| parse_error(path, err))?;
    } else {
        BufReader::new(file)
            .read_to_string(&mut text)
            .map_err(|err| parse_error(path, err))?;
    }
    Ok(vec![text])
}

pub fn read_structure(path: &Path) -> Result<Structure, KiraError> {
    let policy = match ArchiveSource::from_path(path) {
        Some(ArchiveSource::Structure) | Some(ArchiveSource::Bundle) => ModelPolicy::First,
        Some(ArchiveSource::BiologicalAssembly) | None => ModelPolicy::All,
    };
    let mut atoms = Vec::new();
    for (index, member) in read_members(path)?.iter().enumerate() {
        let base = (index as u32 + 1) * 1000;
        let parsed = read_pdb(Cursor::new(member.as_bytes()), policy, base)
            .map_err(|message| parse_error(path, message))?;
        atoms.extend(parsed);
    }
    Ok(Structure::new(atoms))
}

static RESOLUTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^REMARK   2 RESOLUTION\.\s+(\S+)").expect("static regex")
});

/// Reported resolution in Ångström. `Ok(None)` when the entry does not report one
/// (no REMARK 2, or `NOT APPLICABLE`); a value that is present but unreadable is an error.
pub fn resolution_of(path: &Path) -> Result<Option<f64>, KiraError> {
    for member in read_members(path)? {
        if let Some(found) = resolution_in_text(&member) {
            return found.map_err(|message| parse_error(path, message));
        }
    }
    Ok(None)
}

fn resolution_in_text(text: &str) -> Option<Result<Option<f64>, String>> {
    for line in text.lines() {
        if line.starts_with("ATOM  ") || line.starts_with("HETATM") {
            return None;
        }
        let Some(captures) = RESOLUTION_LINE.captures(line) else {
            continue;
        };
        let token = &captures[1];
        if token == "NOT" {
            return Some(Ok(None));
        }
        return Some(
            token
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("invalid resolution {token:?}")),
        );
    }
    None
}

fn parse_error(path: &Path, err: impl ToString) -> KiraError {
    KiraError::StructureParse {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
