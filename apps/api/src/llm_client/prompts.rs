// Prompt text and function schema for the `extract_info` classification call.

/// System instruction establishing the assistant's role.
pub const CLASSIFY_SYSTEM: &str =
    "You are an AI assistant that can classify a job description and extract useful information from it.";

/// User prompt template. Replace `{title}`, `{description}`, `{seniority}`,
/// `{employment_type}` and `{company_name}` before sending.
pub const CLASSIFY_PROMPT_TEMPLATE: &str = "I have a job description that I would like to classify and extract information from: {title}: {description} \n Seniority: {seniority} \n Job Type: {employment_type} \n company name: {company_name}";

pub const EXTRACT_FUNCTION_NAME: &str = "extract_info";

pub const EXTRACT_FUNCTION_DESCRIPTION: &str = "Extract industry and company type of the company, function, domain, skills, and experience required from job description. \
    Function - refers to the primary area or department within an organisation where the job role operates. \
    It represents the broad category of work that the position falls under, indicating the main purpose or responsibility area of the role within the company structure.\
    Domain - specifies the particular area of expertise or specialisation within the broader function. \
    It represents a more focused subset of skills or knowledge required for the role, indicating the specific area of work or technology the position deals with on a day-to-day basis. \
    Examples: (i) for Function - Engineering, Domain - Frontend or Backend or AI or QA or DevOps \
    (ii) for Function - Finance, Domain - Auditing or Investor Relations \
    (iii) for Function - Marketing, Domain - Content Strategy or Social Media or Performance Marketing or Ads";

pub const INDUSTRY_DESCRIPTION: &str = "The industry in which the company belongs, from the list {Aerospace & Defense, Agriculture, \
    Asset Management, Automotive, Banking, Capital Markets, Construction, Consumer Goods, Education, Energy & Utilities, Healthcare, \
    Technology, Manufacturing, Media & Entertainment, Mining & Metals, Pharmaceuticals, \
    Real Estate, Retail, Telecommunications, Transportation & Logistics, Travel & Tourism}";

pub const FUNCTION_DESCRIPTION: &str = "The function of the job role, for example, electrical. From the list of functions: \
    {Engineering, Customer Service, Operations, Sales, Healthcare, Finance, Project Management, Human Resources, \
    Marketing, Administrative, Support Services, Research & Development, Design, Education, Safety & Quality, \
    Information Technology, Professional Services, Manufacturing, Legal & Risk Management, Consulting, Product Management, \
    Data Analysis, Environmental Services, Procurement, Supply Chain Management, Real Estate & Property Management, \
    Public Relations, Event Management, Art & Creative, Transport & Logistics, Food & Beverage Services}";

pub const DOMAIN_DESCRIPTION: &str =
    "The domain, for example, Hardware, remember domain is a subset of function";

pub const COMPANY_TYPE_DESCRIPTION: &str = "The type of the company given the company name, from the list \
    {Small and Medium Enterprises, Large Enterprises, Startups, Multinational Corporations} only";

/// Builds the user message for one posting.
pub fn build_classify_prompt(
    title: &str,
    description: &str,
    seniority: &str,
    employment_type: &str,
    company_name: &str,
) -> String {
    // Single pass so that braces inside posting text are never re-substituted.
    let mut prompt = String::with_capacity(
        CLASSIFY_PROMPT_TEMPLATE.len() + title.len() + description.len() + company_name.len(),
    );
    let mut rest = CLASSIFY_PROMPT_TEMPLATE;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        prompt.push_str(&rest[..start]);
        let value = match &rest[start + 1..start + len] {
            "title" => title,
            "description" => description,
            "seniority" => seniority,
            "employment_type" => employment_type,
            "company_name" => company_name,
            _ => &rest[start..=start + len],
        };
        prompt.push_str(value);
        rest = &rest[start + len + 1..];
    }
    prompt.push_str(rest);
    prompt
}

/// JSON schema of the `extract_info` function's parameters.
pub fn extract_parameters_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "Industry": { "type": "string", "description": INDUSTRY_DESCRIPTION },
            "Function": { "type": "string", "description": FUNCTION_DESCRIPTION },
            "Domain": { "type": "string", "description": DOMAIN_DESCRIPTION },
            "Company_Type": { "type": "string", "description": COMPANY_TYPE_DESCRIPTION }
        },
        "required": ["Industry", "Function", "Domain"]
    })
}
