use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::config::Endpoints;
use crate::domain::{ArchiveSource, PdbId};
use crate::error::KiraError;

#[derive(Debug, Clone, PartialEq)]
pub enum Remote<T> {
    Found(T),
    NotFound,
    ServerError { status: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataEndpoint {
    Assembly,
    Entry,
}

pub trait RcsbClient: Send + Sync {
    fn fetch_archive(&self, id: &PdbId, source: ArchiveSource)
    -> Result<Remote<Vec<u8>>, KiraError>;
    fn fetch_metadata(
        &self,
        id: &PdbId,
        endpoint: MetadataEndpoint,
    ) -> Result<Remote<Value>, KiraError>;
}

#[derive(Clone)]
pub struct RcsbHttpClient {
    client: Client,
    endpoints: Endpoints,
}

impl RcsbHttpClient {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-sc/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::RcsbHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| KiraError::RcsbHttp(err.to_string()))?;
        Ok(Self { client, endpoints })
    }

    pub fn archive_url(&self, id: &PdbId, source: ArchiveSource) -> String {
        let lower = id.lower();
        let hash = id.divided_hash();
        match source {
            ArchiveSource::BiologicalAssembly => {
                format!("{}{hash}/{lower}.pdb1.gz", self.endpoints.biounit)
            }
            ArchiveSource::Bundle => {
                format!(
                    "{}{hash}/{lower}/{lower}-pdb-bundle.tar.gz",
                    self.endpoints.bundle
                )
            }
            ArchiveSource::Structure => {
                format!("{}{hash}/pdb{lower}.ent.gz", self.endpoints.structure)
            }
        }
    }

    pub fn metadata_url(&self, id: &PdbId, endpoint: MetadataEndpoint) -> String {
        match endpoint {
            MetadataEndpoint::Entry => format!("{}{}", self.endpoints.entry_info, id.upper()),
            MetadataEndpoint::Assembly => {
                format!("{}{}/1", self.endpoints.assembly_info, id.upper())
            }
        }
    }

    fn classify(
        response: reqwest::blocking::Response,
    ) -> Result<Remote<reqwest::blocking::Response>, KiraError> {
        let status = response.status();
        if status.is_success() {
            return Ok(Remote::Found(response));
        }
        if is_absent_status(status) {
            return Ok(Remote::NotFound);
        }
        if status.is_server_error() {
            return Ok(Remote::ServerError {
                status: status.as_u16(),
            });
        }
        let message = response
            .text()
            .unwrap_or_else(|_| "RCSB request failed".to_string());
        Err(KiraError::RcsbStatus {
            status: status.as_u16(),
            message,
        })
    }
}

impl RcsbClient for RcsbHttpClient {
    fn fetch_archive(
        &self,
        id: &PdbId,
        source: ArchiveSource,
    ) -> Result<Remote<Vec<u8>>, KiraError> {
        let url = self.archive_url(id, source);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| KiraError::RcsbHttp(err.to_string()))?;
        match Self::classify(response)? {
            Remote::Found(response) => {
                let bytes = response
                    .bytes()
                    .map_err(|err| KiraError::RcsbHttp(err.to_string()))?;
                Ok(Remote::Found(bytes.to_vec()))
            }
            Remote::NotFound => Ok(Remote::NotFound),
            Remote::ServerError { status } => Ok(Remote::ServerError { status }),
        }
    }

    fn fetch_metadata(
        &self,
        id: &PdbId,
        endpoint: MetadataEndpoint,
    ) -> Result<Remote<Value>, KiraError> {
        let url = self.metadata_url(id, endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| KiraError::RcsbHttp(err.to_string()))?;
        match Self::classify(response)? {
            Remote::Found(response) => {
                let payload: Value = response
                    .json()
                    .map_err(|err| KiraError::RcsbMalformed(format!("{url}: {err}")))?;
                Ok(classify_payload(payload))
            }
            Remote::NotFound => Ok(Remote::NotFound),
            Remote::ServerError { status } => Ok(Remote::ServerError { status }),
        }
    }
}

pub fn classify_payload(payload: Value) -> Remote<Value> {
    match payload.get("status").and_then(|value| value.as_u64()) {
        Some(404) => Remote::NotFound,
        Some(status) if status >= 500 => Remote::ServerError {
            status: status as u16,
        },
        _ => Remote::Found(payload),
    }
}

fn is_absent_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::FORBIDDEN
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> RcsbHttpClient {
        RcsbHttpClient::new(Endpoints::default(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn archive_urls_fold_case() {
        let client = client();
        let id: PdbId = "4HHB".parse().unwrap();
        assert_eq!(
            client.archive_url(&id, ArchiveSource::BiologicalAssembly),
            "https://ftp.wwpdb.org/pub/pdb/data/biounit/PDB/divided/hh/4hhb.pdb1.gz"
        );
        assert_eq!(
            client.archive_url(&id, ArchiveSource::Bundle),
            "https://files.rcsb.org/pub/pdb/compatible/pdb_bundle/hh/4hhb/4hhb-pdb-bundle.tar.gz"
        );
        assert_eq!(
            client.archive_url(&id, ArchiveSource::Structure),
            "https://ftp.wwpdb.org/pub/pdb/data/structures/divided/pdb/hh/pdb4hhb.ent.gz"
        );
    }

    #[test]
    fn metadata_urls_upper_case() {
        let client = client();
        let id: PdbId = "4hhb".parse().unwrap();
        assert_eq!(
            client.metadata_url(&id, MetadataEndpoint::Assembly),
            "https://data.rcsb.org/rest/v1/core/assembly/4HHB/1"
        );
        assert_eq!(
            client.metadata_url(&id, MetadataEndpoint::Entry),
            "https://data.rcsb.org/rest/v1/core/entry/4HHB"
        );
    }

    #[test]
    fn payload_status_field() {
        assert_eq!(
            classify_payload(json!({"status": 404, "message": "No data"})),
            Remote::NotFound
        );
        assert_eq!(
            classify_payload(json!({"status": 500})),
            Remote::ServerError { status: 500 }
        );
        assert!(matches!(
            classify_payload(json!({"rcsb_id": "4HHB"})),
            Remote::Found(_)
        ));
    }
}
