use crate::{
    client::{
        ConohaClient,
        Service,
    },
    error::Result,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PaymentSummary {
    /// Remaining prepaid deposit.
    pub total_deposit_amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Deserialize)]
struct PaymentSummaryResponse {
    payment_summary: PaymentSummary,
}

impl ConohaClient {
    pub async fn payment_summary(&self) -> Result<PaymentSummary> {
        let response: PaymentSummaryResponse = self.get_json(Service::Account, "/payment-summary").await?;
        Ok(response.payment_summary)
    }
}
