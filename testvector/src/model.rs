//! The test vector tree.
//!
//! ```text
//! TestVector
//!  └─ TestCase*
//!      ├─ ActionGroup* ── Action*   (stimuli, applied in group order)
//!      └─ Expectation*              (checks, run after every action group)
//! ```
//!
//! Files are JSON or YAML renderings of this tree. Byte strings (entities,
//! payloads, pipeline blobs) are written as hex, with an optional `0x`
//! prefix.

use {
    serde::{Deserialize, Serialize},
    tvr_p4rt::{
        proto::{
            forwarding_pipeline_config::Cookie, set_forwarding_pipeline_config_request,
            update, write_request, ForwardingPipelineConfig, PacketIn, PacketMetadata, PacketOut,
            SetForwardingPipelineConfigRequest, Update, WriteRequest,
        },
        ArbitrationIdentity, ElectionId,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestVector {
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    pub test_case_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub action_groups: Vec<ActionGroup>,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

/// How the actions inside one group are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One after another, in file order.
    #[default]
    Sequential,
    /// All at once.
    Parallel,
    /// One after another, in a shuffled order.
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionGroup {
    pub action_group_id: String,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Write(WriteAction),
    PipelineConfig(PipelineConfigAction),
    PacketOut(PacketOutAction),
}

impl Action {
    pub const WRITE: &'static str = "write";
    pub const PIPELINE_CONFIG: &'static str = "pipeline_config";
    pub const PACKET_OUT: &'static str = "packet_out";

    /// Handler lookup key; matches the `kind` tag in the file.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Write(_) => Self::WRITE,
            Self::PipelineConfig(_) => Self::PIPELINE_CONFIG,
            Self::PacketOut(_) => Self::PACKET_OUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    pub expectation_id: String,
    pub check: Check,
}

impl Expectation {
    pub fn kind(&self) -> &'static str {
        self.check.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Check {
    PacketIn(PacketInCheck),
}

impl Check {
    pub const PACKET_IN: &'static str = "packet_in";

    pub fn kind(&self) -> &'static str {
        match self {
            Self::PacketIn(_) => Self::PACKET_IN,
        }
    }
}

// ── Control plane ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    #[default]
    Unspecified,
    Insert,
    Modify,
    Delete,
}

impl From<UpdateType> for update::Type {
    fn from(value: UpdateType) -> Self {
        match value {
            UpdateType::Unspecified => Self::Unspecified,
            UpdateType::Insert => Self::Insert,
            UpdateType::Modify => Self::Modify,
            UpdateType::Delete => Self::Delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSpec {
    #[serde(rename = "type")]
    pub update_type: UpdateType,
    /// Encoded `p4.v1.Entity`.
    #[serde(with = "hex_bytes")]
    pub entity: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Atomicity {
    #[default]
    ContinueOnError,
    RollbackOnError,
    DataplaneAtomic,
}

impl From<Atomicity> for write_request::Atomicity {
    fn from(value: Atomicity) -> Self {
        match value {
            Atomicity::ContinueOnError => Self::ContinueOnError,
            Atomicity::RollbackOnError => Self::RollbackOnError,
            Atomicity::DataplaneAtomic => Self::DataplaneAtomic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteAction {
    pub device_id: u64,
    #[serde(default)]
    pub role_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_id: Option<ElectionId>,
    #[serde(default)]
    pub updates: Vec<UpdateSpec>,
    #[serde(default)]
    pub atomicity: Atomicity,
}

impl WriteAction {
    pub fn to_request(&self) -> WriteRequest {
        WriteRequest {
            device_id: self.device_id,
            role_id: self.role_id,
            election_id: self.election_id.map(Into::into),
            updates: self
                .updates
                .iter()
                .map(|entry| Update {
                    r#type: update::Type::from(entry.update_type) as i32,
                    entity: Some(entry.entity.clone()),
                })
                .collect(),
            atomicity: write_request::Atomicity::from(self.atomicity) as i32,
            role: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineAction {
    #[default]
    Unspecified,
    Verify,
    VerifyAndSave,
    VerifyAndCommit,
    Commit,
    ReconcileAndCommit,
}

impl From<PipelineAction> for set_forwarding_pipeline_config_request::Action {
    fn from(value: PipelineAction) -> Self {
        match value {
            PipelineAction::Unspecified => Self::Unspecified,
            PipelineAction::Verify => Self::Verify,
            PipelineAction::VerifyAndSave => Self::VerifyAndSave,
            PipelineAction::VerifyAndCommit => Self::VerifyAndCommit,
            PipelineAction::Commit => Self::Commit,
            PipelineAction::ReconcileAndCommit => Self::ReconcileAndCommit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfigAction {
    pub device_id: u64,
    #[serde(default)]
    pub role_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_id: Option<ElectionId>,
    #[serde(default)]
    pub action: PipelineAction,
    /// Encoded `p4.config.v1.P4Info`.
    #[serde(default, with = "hex_bytes::option", skip_serializing_if = "Option::is_none")]
    pub p4info: Option<Vec<u8>>,
    #[serde(default, with = "hex_bytes")]
    pub p4_device_config: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<u64>,
}

impl PipelineConfigAction {
    pub fn to_request(&self) -> SetForwardingPipelineConfigRequest {
        SetForwardingPipelineConfigRequest {
            device_id: self.device_id,
            role_id: self.role_id,
            election_id: self.election_id.map(Into::into),
            action: set_forwarding_pipeline_config_request::Action::from(self.action) as i32,
            config: Some(ForwardingPipelineConfig {
                p4info: self.p4info.clone(),
                p4_device_config: self.p4_device_config.clone(),
                cookie: self.cookie.map(|cookie| Cookie { cookie }),
            }),
            role: String::new(),
        }
    }
}

// ── Data plane ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub metadata_id: u32,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
}

impl From<&Metadata> for PacketMetadata {
    fn from(value: &Metadata) -> Self {
        Self {
            metadata_id: value.metadata_id,
            value: value.value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacketOutAction {
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
    /// Arbitration identity for the packet-out gate. The session default is
    /// used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ArbitrationIdentity>,
}

impl PacketOutAction {
    pub fn to_packet(&self) -> PacketOut {
        PacketOut {
            payload: self.payload.clone(),
            metadata: self.metadata.iter().map(PacketMetadata::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacketInCheck {
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    /// Informational only; packets are matched on payload.
    #[serde(default)]
    pub metadata: Vec<Metadata>,
}

impl PacketInCheck {
    pub fn to_packet(&self) -> PacketIn {
        PacketIn {
            payload: self.payload.clone(),
            metadata: self.metadata.iter().map(PacketMetadata::from).collect(),
        }
    }
}

/// Hex string (de)serialization for byte fields.
pub mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        decode(&text).map_err(Error::custom)
    }

    /// Decode `text`, ignoring a leading `0x` and any whitespace.
    pub fn decode(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let digits: String = digits.chars().filter(|c| !c.is_whitespace()).collect();
        hex::decode(digits)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(bytes) => super::serialize(bytes, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| super::decode(&text).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
