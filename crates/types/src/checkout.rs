use serde::{Deserialize, Serialize};

/// Body of `POST /api/checkout`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub price_id: String,
}

/// Successful answer of `POST /api/checkout`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_are_camel_case() {
        let body = serde_json::to_value(CheckoutRequest {
            price_id: "price_1".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "priceId": "price_1" }));

        let response: CheckoutResponse =
            serde_json::from_str(r#"{"checkoutUrl":"https://checkout.stripe.com/c/pay/cs_test"}"#)
                .unwrap();
        assert_eq!(
            response.checkout_url,
            "https://checkout.stripe.com/c/pay/cs_test"
        );
    }
}
