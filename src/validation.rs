//! Start-input validation
//!
//! Field-level validation of the salesperson and customer inputs, performed
//! before the state machine sees a start request. Produces the typed
//! `(BusinessInfo, CustomerInput)` pair or the first field error found.

use crate::resolver::CustomerInput;
use crate::state_machine::state::BusinessInfo;
use serde::Deserialize;

/// Raw start request as submitted by the client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub business_info: BusinessInfoForm,
    pub customer_info: CustomerInfoForm,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessInfoForm {
    pub user_name: String,
    pub business_name: String,
    pub product_service: String,
    pub sales_goals: String,
}

/// Customer info with a discriminator: exactly one of a URL or a text
/// summary must be provided, matching the selected type
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfoForm {
    #[serde(rename = "type")]
    pub kind: CustomerInfoKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerInfoKind {
    Url,
    Text,
}

/// A field-level validation failure
#[derive(Debug, Clone, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a raw start request into typed inputs.
pub fn validate(request: StartRequest) -> Result<(BusinessInfo, CustomerInput), ValidationError> {
    let business = validate_business(request.business_info)?;
    let customer = validate_customer(request.customer_info)?;
    Ok((business, customer))
}

fn validate_business(form: BusinessInfoForm) -> Result<BusinessInfo, ValidationError> {
    if form.user_name.trim().is_empty() {
        return Err(ValidationError::new(
            "businessInfo.userName",
            "Your name is required.",
        ));
    }
    if form.business_name.trim().is_empty() {
        return Err(ValidationError::new(
            "businessInfo.businessName",
            "Business name is required.",
        ));
    }
    if form.product_service.trim().is_empty() {
        return Err(ValidationError::new(
            "businessInfo.productService",
            "Product/Service description is required.",
        ));
    }
    if form.sales_goals.trim().is_empty() {
        return Err(ValidationError::new(
            "businessInfo.salesGoals",
            "Sales goals are required.",
        ));
    }
    Ok(BusinessInfo {
        user_name: form.user_name.trim().to_string(),
        business_name: form.business_name.trim().to_string(),
        product_service: form.product_service.trim().to_string(),
        sales_goals: form.sales_goals.trim().to_string(),
    })
}

fn validate_customer(form: CustomerInfoForm) -> Result<CustomerInput, ValidationError> {
    match form.kind {
        CustomerInfoKind::Url => {
            let url = form.url.unwrap_or_default();
            let url = url.trim();
            if url.is_empty() {
                return Err(ValidationError::new(
                    "customerInfo.url",
                    "Please provide a valid URL if 'Website URL' is selected.",
                ));
            }
            let parsed = reqwest::Url::parse(url)
                .map_err(|_| ValidationError::new("customerInfo.url", "Invalid URL format."))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ValidationError::new(
                    "customerInfo.url",
                    "Invalid URL format.",
                ));
            }
            Ok(CustomerInput::Url {
                url: url.to_string(),
            })
        }
        CustomerInfoKind::Text => {
            let text = form.text.unwrap_or_default();
            if text.trim().is_empty() {
                return Err(ValidationError::new(
                    "customerInfo.text",
                    "Please provide a summary if 'Text Summary' is selected.",
                ));
            }
            Ok(CustomerInput::Text { text })
        }
    }
}
