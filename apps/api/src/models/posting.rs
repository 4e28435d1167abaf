use serde::{Deserialize, Serialize};

/// One job listing as stored in the input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub description: String,
    pub seniority: String,
    pub company_name: String,
    pub employment_type: String,
}

/// Attributes the model returns through the `extract_info` function call.
///
/// Field names follow the function's parameter schema. Only presence is
/// checked; values outside the suggested vocabularies are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedAttributes {
    #[serde(rename = "Industry")]
    pub industry: String,
    #[serde(rename = "Function")]
    pub function: String,
    #[serde(rename = "Domain")]
    pub domain: String,
    #[serde(rename = "Company_Type", default, skip_serializing_if = "Option::is_none")]
    pub company_type: Option<String>,
}

/// Classified posting: model attributes plus the originating posting fields,
/// so the record stays self-contained after the LLM call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub industry: String,
    pub function: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_type: Option<String>,
    pub title: String,
    pub description: String,
    pub seniority: String,
    pub company_name: String,
    pub employment_type: String,
}

impl ExtractionResult {
    pub fn from_parts(attributes: ExtractedAttributes, posting: &JobPosting) -> Self {
        let ExtractedAttributes {
            industry,
            function,
            domain,
            company_type,
        } = attributes;
        Self {
            industry,
            function,
            domain,
            company_type,
            title: posting.title.clone(),
            description: posting.description.clone(),
            seniority: posting.seniority.clone(),
            company_name: posting.company_name.clone(),
            employment_type: posting.employment_type.clone(),
        }
    }
}
