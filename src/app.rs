use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::acquire::AcquisitionManager;
use crate::config::Settings;
use crate::domain::{InputKind, PdbId, read_id_list};
use crate::error::KiraError;
use crate::metrics::size_metrics;
use crate::rcsb::RcsbClient;
use crate::record::SizeMetrics;
use crate::store::Store;
use crate::toolkit::StructureToolkit;

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub items: Vec<FetchItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchItem {
    pub target: String,
    pub action: String,
    pub path: Option<String>,
    pub resolution: Option<f64>,
    pub size: Option<SizeMetrics>,
}

pub fn fetch<R: RcsbClient, T: StructureToolkit>(
    input: &InputKind,
    client: &R,
    toolkit: &T,
    store: &Store,
    settings: &Settings,
) -> Result<FetchReport, KiraError> {
    let items = match input {
        InputKind::PdbId(id) => {
            store.ensure_layout()?;
            vec![fetch_id(id, client, store, settings)?]
        }
        InputKind::IdListFile(path) => {
            store.ensure_layout()?;
            let ids = read_id_list(path)?;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(settings.jobs.max(1))
                .build()
                .map_err(|err| KiraError::WorkerPool(err.to_string()))?;
            pool.install(|| {
                ids.par_iter()
                    .map(|id| fetch_id(id, client, store, settings))
                    .collect::<Result<Vec<_>, KiraError>>()
            })?
        }
        InputKind::StructureFile(path) => vec![inspect_file(path, toolkit)],
        InputKind::StructureDir(dir) => {
            let mut paths: Vec<_> = fs::read_dir(dir)
                .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", dir.display())))?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| {
                    path.extension()
                        .map(|ext| ext == "pdb" || ext == "gz")
                        .unwrap_or(false)
                })
                .collect();
            paths.sort();
            paths.iter().map(|path| inspect_file(path, toolkit)).collect()
        }
    };
    Ok(FetchReport { items })
}

fn fetch_id<R: RcsbClient>(
    id: &PdbId,
    client: &R,
    store: &Store,
    settings: &Settings,
) -> Result<FetchItem, KiraError> {
    let already = store.find_downloaded(id).is_some();
    let manager =
        AcquisitionManager::new(client, store, settings.retry_budget, settings.retry_delay());
    let path = manager.acquire_path(id)?;
    let action = match (&path, already) {
        (Some(_), true) => "cached",
        (Some(_), false) => "downloaded",
        (None, _) => "failed",
    };
    Ok(FetchItem {
        target: id.to_string(),
        action: action.to_string(),
        path: path.map(|path| path.to_string()),
        resolution: None,
        size: None,
    })
}

fn inspect_file<T: StructureToolkit>(path: &Path, toolkit: &T) -> FetchItem {
    let mut item = FetchItem {
        target: path.display().to_string(),
        action: "local".to_string(),
        path: Some(path.display().to_string()),
        resolution: None,
        size: None,
    };
    match toolkit.resolution_of(path) {
        Ok(resolution) => item.resolution = resolution,
        Err(err) => warn!("{}: {err}", path.display()),
    }
    match toolkit.parse(path) {
        Ok(structure) => item.size = Some(size_metrics(&structure)),
        Err(err) => {
            warn!("{}: {err}", path.display());
            item.action = "unreadable".to_string();
        }
    }
    item
}
