//! Ledger configuration

use std::time::Duration;

use crate::domain::policy::EndorsementPolicy;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub network_name: String,
    pub channel: String,
    pub chaincode: String,
    /// MSP ids of the endorsing peers
    pub peers: Vec<String>,
    /// Distinct endorsements needed; `None` means majority
    pub required_endorsements: Option<usize>,
    /// Simulated endorse + order + commit time
    pub latency: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network_name: "credential-network".to_string(),
            channel: "credentials".to_string(),
            chaincode: "credential-registry".to_string(),
            peers: vec![
                "UniversityMSP".to_string(),
                "AccreditationMSP".to_string(),
                "EmployerMSP".to_string(),
            ],
            required_endorsements: None,
            latency: Duration::from_millis(150),
        }
    }
}

impl LedgerConfig {
    pub fn development() -> Self {
        Self {
            latency: Duration::from_millis(25),
            ..Default::default()
        }
    }

    /// No simulated latency
    pub fn instant() -> Self {
        Self {
            latency: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> EndorsementPolicy {
        match self.required_endorsements {
            Some(required) => EndorsementPolicy::new(self.peers.iter().cloned(), required),
            None => EndorsementPolicy::majority(self.peers.iter().cloned()),
        }
    }
}
