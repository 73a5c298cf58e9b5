use serde::{Deserialize, Serialize};

use crate::domain::{ProcessRecord, ProcessStatus, Summary};

/// Write subset of a processo: everything the form collects. `data_entrada`
/// is deliberately absent; the store assigns it on create and updates never
/// carry it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessoFields {
    pub numero: String,
    pub responsavel: String,
    pub status: ProcessStatus,
    #[serde(rename = "anexoUrl", default, skip_serializing_if = "Option::is_none")]
    pub anexo_url: Option<String>,
}

/// What the dashboard renders: KPI counts plus the canonically ordered
/// collection (most recent `dataEntrada` first).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub summary: Summary,
    pub processos: Vec<ProcessRecord>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatusShare {
    pub count: usize,
    /// Exact share of the total, 0.0..=100.0; the report bars use the raw
    /// value, only the completion rate is rounded.
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportView {
    pub total: usize,
    pub taxa_conclusao: u32,
    pub pendentes: StatusShare,
    pub autorizados: StatusShare,
    pub rejeitados: StatusShare,
    pub processos: Vec<ProcessRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnexoUploadResponse {
    #[serde(rename = "anexoUrl")]
    pub anexo_url: String,
    pub size_bytes: usize,
}
