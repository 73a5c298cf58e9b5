use std::cmp::Ordering;

use shared::{
    domain::{ProcessRecord, ProcessStatus, Summary},
    protocol::DashboardSnapshot,
};

/// Computes the KPI counts and the canonical ordering for a fetched
/// collection. Pure: no validation, no I/O, no failure modes — a record
/// with an unrecognized status simply lands in no bucket.
pub fn compute_snapshot(mut processos: Vec<ProcessRecord>) -> DashboardSnapshot {
    let mut summary = Summary {
        total: processos.len(),
        ..Summary::default()
    };
    for processo in &processos {
        match processo.status {
            ProcessStatus::Pendente => summary.pendentes += 1,
            ProcessStatus::Autorizado => summary.autorizados += 1,
            ProcessStatus::Rejeitado => summary.rejeitados += 1,
            ProcessStatus::Outro(_) => {}
        }
    }
    summary.analisados = summary.autorizados + summary.rejeitados;
    // Current business rule: "finalizado" is literally "analisado". Flagged
    // for product clarification; do not infer a different formula here.
    summary.finalizados = summary.analisados;

    // Most recent entry first. ISO dates order lexicographically the same
    // way they order chronologically; undated records always sort last.
    // The sort is stable, so equal dates keep their fetch order.
    processos.sort_by(|a, b| match (a.data_entrada, b.data_entrada) {
        (Some(a_date), Some(b_date)) => b_date.cmp(&a_date),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    DashboardSnapshot {
        summary,
        processos,
    }
}

/// Share of finalized processos as a whole percentage, rounded half-up.
/// Zero for an empty collection.
pub fn completion_rate(summary: &Summary) -> u32 {
    if summary.total == 0 {
        return 0;
    }
    ((summary.finalizados as f64 / summary.total as f64) * 100.0).round() as u32
}
