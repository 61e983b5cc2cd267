// [libs/infra/uplink/src/review_queue.rs]
/*!
 * =================================================================
 * APARATO: REVIEW QUEUE UPLINK (V2.1 - HUMAN ADJUDICATION BRIDGE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENCOLADO DE TAREAS DE REVISIÓN DOCUMENTAL
 *
 * El colaborador retorna el identificador externo de revisión; la
 * decisión regresa después como señal 'review_decision' a través del
 * gateway, nunca por esta vía.
 * =================================================================
 */

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use veritas_domain_protocols::{PortFault, ReviewQueuePort, ReviewTask};

use crate::errors::UplinkError;
use crate::forge_network_client;

#[derive(Deserialize)]
struct EnqueueReceipt {
    review_id: String,
}

/// Cliente de la cola externa de revisión humana.
pub struct HttpReviewQueue {
    network_client: Client,
    queue_base_endpoint: String,
}

impl HttpReviewQueue {
    pub fn new(base_url: String) -> Result<Self, UplinkError> {
        Ok(Self {
            network_client: forge_network_client("Veritas-ReviewQueue-Uplink/V2.1")?,
            queue_base_endpoint: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip(self, task), fields(subject = %task.subject_id, method = %task.method.as_label()))]
    pub async fn dispatch(&self, task: &ReviewTask) -> Result<String, UplinkError> {
        let target_url = format!("{}/api/v1/reviews/enqueue", self.queue_base_endpoint);

        let response = self.network_client.post(&target_url).json(task).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("⚠️ [REVIEW_REJECTION]: Queue returned {} for run [{}].", status, task.protocol_run_id);
            return Err(UplinkError::Rejection { status: status.as_u16() });
        }

        let receipt: EnqueueReceipt = response
            .json()
            .await
            .map_err(|fault| UplinkError::ContractViolation(fault.to_string()))?;

        info!("📋 [REVIEW_ENQUEUED]: External review [{}] opened.", receipt.review_id);
        Ok(receipt.review_id)
    }
}

#[async_trait]
impl ReviewQueuePort for HttpReviewQueue {
    async fn enqueue_review(&self, task: ReviewTask) -> Result<String, PortFault> {
        self.dispatch(&task)
            .await
            .map_err(|uplink_fault| PortFault::Unavailable(uplink_fault.to_string()))
    }
}
