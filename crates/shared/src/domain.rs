use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub i64);

/// Workflow state of a processo. The stored value is an open set: anything
/// other than the three known strings round-trips verbatim as `Outro` and
/// counts toward none of the dashboard buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessStatus {
    Pendente,
    Autorizado,
    Rejeitado,
    Outro(String),
}

impl ProcessStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProcessStatus::Pendente => "Pendente",
            ProcessStatus::Autorizado => "Autorizado",
            ProcessStatus::Rejeitado => "Rejeitado",
            ProcessStatus::Outro(raw) => raw,
        }
    }
}

impl From<String> for ProcessStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Pendente" => ProcessStatus::Pendente,
            "Autorizado" => ProcessStatus::Autorizado,
            "Rejeitado" => ProcessStatus::Rejeitado,
            _ => ProcessStatus::Outro(raw),
        }
    }
}

impl From<ProcessStatus> for String {
    fn from(status: ProcessStatus) -> Self {
        status.as_str().to_string()
    }
}

/// A tracked case record. `id` is `None` until the store assigns one;
/// `data_entrada` is set once at creation and never mutated by updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProcessId>,
    pub numero: String,
    pub responsavel: String,
    pub status: ProcessStatus,
    #[serde(
        rename = "dataEntrada",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data_entrada: Option<NaiveDate>,
    #[serde(rename = "anexoUrl", default, skip_serializing_if = "Option::is_none")]
    pub anexo_url: Option<String>,
}

/// Dashboard KPI counts. `finalizados` mirrors `analisados` by the current
/// business rule; kept identical on purpose pending product clarification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub pendentes: usize,
    pub autorizados: usize,
    pub rejeitados: usize,
    pub analisados: usize,
    pub finalizados: usize,
}
