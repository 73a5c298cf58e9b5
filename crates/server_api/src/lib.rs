use dashboard_core::{completion_rate, compute_snapshot};
use shared::{
    domain::{ProcessId, ProcessRecord},
    error::{ApiError, ErrorCode},
    protocol::{DashboardSnapshot, ProcessoFields, ReportView, StatusShare},
};
use storage::Storage;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

/// Fetches the full collection and runs the aggregator over it.
pub async fn dashboard(ctx: &ApiContext) -> Result<DashboardSnapshot, ApiError> {
    let processos = ctx.storage.list_processos().await.map_err(unavailable)?;
    Ok(compute_snapshot(processos))
}

/// The reporting view: completion rate plus per-status shares for the bar
/// widths, over the same ordered collection the dashboard shows.
pub async fn report(ctx: &ApiContext) -> Result<ReportView, ApiError> {
    let snapshot = dashboard(ctx).await?;
    let summary = snapshot.summary;
    Ok(ReportView {
        total: summary.total,
        taxa_conclusao: completion_rate(&summary),
        pendentes: share(summary.pendentes, summary.total),
        autorizados: share(summary.autorizados, summary.total),
        rejeitados: share(summary.rejeitados, summary.total),
        processos: snapshot.processos,
    })
}

pub async fn get_processo(ctx: &ApiContext, id: ProcessId) -> Result<ProcessRecord, ApiError> {
    ctx.storage
        .get_processo(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "processo not found"))
}

/// Creates (no id) or updates (id present) a processo and hands back the
/// persisted record, re-read so the caller sees exactly what the store
/// holds (assigned id, assigned entry date).
pub async fn save_processo(
    ctx: &ApiContext,
    id: Option<ProcessId>,
    fields: ProcessoFields,
) -> Result<ProcessRecord, ApiError> {
    let id = match id {
        None => ctx
            .storage
            .create_processo(&fields)
            .await
            .map_err(internal)?,
        Some(id) => {
            let updated = ctx
                .storage
                .update_processo(id, &fields)
                .await
                .map_err(internal)?;
            if !updated {
                return Err(ApiError::new(ErrorCode::NotFound, "processo not found"));
            }
            id
        }
    };
    get_processo(ctx, id).await
}

fn share(count: usize, total: usize) -> StatusShare {
    let percent = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    };
    StatusShare { count, percent }
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

fn unavailable(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Unavailable, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::ProcessStatus;

    async fn setup() -> ApiContext {
        let storage = Storage::new("sqlite::memory:").await.expect("db");
        ApiContext { storage }
    }

    fn fields(numero: &str, status: &str) -> ProcessoFields {
        ProcessoFields {
            numero: numero.to_string(),
            responsavel: "Elisa".to_string(),
            status: ProcessStatus::from(status.to_string()),
            anexo_url: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_entry_date() {
        let ctx = setup().await;
        let record = save_processo(&ctx, None, fields("2024/0100", "Pendente"))
            .await
            .expect("save");
        assert!(record.id.is_some());
        assert!(record.data_entrada.is_some());
    }

    #[tokio::test]
    async fn dashboard_counts_and_orders_saved_processos() {
        let ctx = setup().await;
        save_processo(&ctx, None, fields("2024/0101", "Pendente"))
            .await
            .expect("save");
        save_processo(&ctx, None, fields("2024/0102", "Autorizado"))
            .await
            .expect("save");

        let snapshot = dashboard(&ctx).await.expect("dashboard");
        assert_eq!(snapshot.summary.total, 2);
        assert_eq!(snapshot.summary.pendentes, 1);
        assert_eq!(snapshot.summary.autorizados, 1);
        assert_eq!(snapshot.summary.analisados, 1);
        assert_eq!(snapshot.processos.len(), 2);
    }

    #[tokio::test]
    async fn update_of_unknown_id_maps_to_not_found() {
        let ctx = setup().await;
        let err = save_processo(&ctx, Some(ProcessId(9000)), fields("x", "Pendente"))
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn report_shares_sum_to_total_for_recognized_statuses() {
        let ctx = setup().await;
        save_processo(&ctx, None, fields("2024/0103", "Autorizado"))
            .await
            .expect("save");
        save_processo(&ctx, None, fields("2024/0104", "Rejeitado"))
            .await
            .expect("save");
        save_processo(&ctx, None, fields("2024/0105", "Pendente"))
            .await
            .expect("save");
        save_processo(&ctx, None, fields("2024/0106", "Pendente"))
            .await
            .expect("save");

        let view = report(&ctx).await.expect("report");
        assert_eq!(view.total, 4);
        assert_eq!(view.taxa_conclusao, 50);
        assert_eq!(view.pendentes.count, 2);
        assert!((view.pendentes.percent - 50.0).abs() < f64::EPSILON);
        assert!((view.autorizados.percent - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn report_on_empty_store_is_all_zero() {
        let ctx = setup().await;
        let view = report(&ctx).await.expect("report");
        assert_eq!(view.total, 0);
        assert_eq!(view.taxa_conclusao, 0);
        assert_eq!(view.pendentes.count, 0);
        assert_eq!(view.pendentes.percent, 0.0);
    }
}
