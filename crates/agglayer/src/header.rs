use crate::status::CertificateStatus;

use alloy_primitives::B256;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A flattened agglayer error: the discriminating key and its serialized
/// payload.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericError {
    /// The error key reported by the agglayer.
    pub key: String,
    /// The serialized error payload.
    pub value: String,
}

impl fmt::Display for GenericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[agglayer error] {}: {}", self.key, self.value)
    }
}

impl std::error::Error for GenericError {}

/// The certificate header returned by the agglayer node-state service.
///
/// The `status` field may arrive either as a bare string or as
/// `{"InError": {"error": {key: value}}}`; the latter is flattened into
/// [`CertificateHeader::error`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateHeader {
    /// The id of the network the certificate proves.
    pub network_id: u32,
    /// The height of the certificate.
    pub height: u64,
    /// The epoch the certificate settled in.
    pub epoch_number: Option<u64>,
    /// The index of the certificate inside its epoch.
    pub certificate_index: Option<u64>,
    /// The certificate id.
    pub certificate_id: B256,
    /// The local exit root before the certified range.
    #[serde(rename = "prev_local_exit_root", skip_serializing_if = "Option::is_none")]
    pub previous_local_exit_root: Option<B256>,
    /// The local exit root after the certified range.
    pub new_local_exit_root: B256,
    /// The remote status of the certificate.
    pub status: CertificateStatus,
    /// The certificate metadata.
    pub metadata: B256,
    /// The agglayer error carried by an `InError` status.
    #[serde(skip)]
    pub error: Option<GenericError>,
    /// The hash of the settlement transaction, when settled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_tx_hash: Option<B256>,
}

impl CertificateHeader {
    /// Returns a short identifier of the certificate for logging.
    pub fn id(&self) -> String {
        format!("{}/{}", self.height, self.certificate_id)
    }
}

impl fmt::Display for CertificateHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "header{{height: {}, certificateID: {}, status: {}}}",
            self.height, self.certificate_id, self.status
        )
    }
}

impl<'de> Deserialize<'de> for CertificateHeader {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Aux {
            network_id: u32,
            height: u64,
            #[serde(default)]
            epoch_number: Option<u64>,
            #[serde(default)]
            certificate_index: Option<u64>,
            certificate_id: B256,
            #[serde(rename = "prev_local_exit_root", default)]
            previous_local_exit_root: Option<B256>,
            new_local_exit_root: B256,
            status: serde_json::Value,
            metadata: B256,
            #[serde(default)]
            settlement_tx_hash: Option<B256>,
        }

        let aux = Aux::deserialize(deserializer)?;
        let (status, error) = parse_status(aux.status).map_err(serde::de::Error::custom)?;

        Ok(Self {
            network_id: aux.network_id,
            height: aux.height,
            epoch_number: aux.epoch_number,
            certificate_index: aux.certificate_index,
            certificate_id: aux.certificate_id,
            previous_local_exit_root: aux.previous_local_exit_root,
            new_local_exit_root: aux.new_local_exit_root,
            status,
            metadata: aux.metadata,
            error,
            settlement_tx_hash: aux.settlement_tx_hash,
        })
    }
}

fn parse_status(
    value: serde_json::Value,
) -> Result<(CertificateStatus, Option<GenericError>), String> {
    match value {
        serde_json::Value::String(raw) => {
            let status = raw.parse::<CertificateStatus>()?;
            Ok((status, None))
        }
        serde_json::Value::Object(map) => {
            let in_error = map
                .get("InError")
                .and_then(|value| value.as_object())
                .ok_or_else(|| "invalid status object, expected InError".to_owned())?;
            let error_map = in_error
                .get("error")
                .and_then(|value| value.as_object())
                .ok_or_else(|| "InError status without error payload".to_owned())?;
            let error = error_map.iter().next().map(|(key, value)| GenericError {
                key: key.clone(),
                value: value.to_string(),
            });
            Ok((CertificateStatus::InError, error))
        }
        other => Err(format!("invalid status type: {other}")),
    }
}

/// The epoch clock configuration returned by the agglayer configuration
/// service.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfiguration {
    /// The number of L1 blocks per epoch.
    pub epoch_duration: u64,
    /// The L1 block the first epoch starts at.
    pub genesis_block: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_with_string_status() {
        let raw = serde_json::json!({
            "network_id": 2,
            "height": 5,
            "epoch_number": 10,
            "certificate_index": 0,
            "certificate_id": B256::repeat_byte(1),
            "prev_local_exit_root": B256::repeat_byte(2),
            "new_local_exit_root": B256::repeat_byte(3),
            "status": "Settled",
            "metadata": B256::repeat_byte(4),
            "settlement_tx_hash": B256::repeat_byte(5),
        });

        let header: CertificateHeader = serde_json::from_value(raw).unwrap();
        assert_eq!(header.status, CertificateStatus::Settled);
        assert!(header.error.is_none());
        assert_eq!(header.settlement_tx_hash, Some(B256::repeat_byte(5)));
    }

    #[test]
    fn test_header_with_in_error_object_status() {
        let raw = serde_json::json!({
            "network_id": 2,
            "height": 5,
            "certificate_id": B256::repeat_byte(1),
            "new_local_exit_root": B256::repeat_byte(3),
            "status": {"InError": {"error": {"TrustedSequencerNotFound": {"network": 2}}}},
            "metadata": B256::repeat_byte(4),
        });

        let header: CertificateHeader = serde_json::from_value(raw).unwrap();
        assert_eq!(header.status, CertificateStatus::InError);
        let error = header.error.unwrap();
        assert_eq!(error.key, "TrustedSequencerNotFound");
        assert!(error.value.contains("network"));
    }
}
