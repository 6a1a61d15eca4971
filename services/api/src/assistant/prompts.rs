//! services/api/src/assistant/prompts.rs
//!
//! Prompt templates for every assistant operation.

use outreach_core::domain::Faq;
use serde_json::{Map, Value};

/// How many CSV rows are shown to the model.
pub const CSV_PREVIEW_ROWS: usize = 10;

pub fn tone(message: &str, tone: &str) -> String {
    format!(
        "Rewrite this WhatsApp message to have a {tone} tone while keeping it professional and engaging.\n\
         Original message: \"{message}\"\n\n\
         Return only the rewritten message, nothing else."
    )
}

pub fn standardize_name(name: &str) -> String {
    format!(
        "Please standardize this contact name to a professional format.\n\
         Return only the standardized name, nothing else.\n\
         Examples:\n\
         - \"john doe\" → \"John Doe\"\n\
         - \"jane smith-md\" → \"Jane Smith\"\n\
         - \"bob johnson ceo\" → \"Bob Johnson\"\n\n\
         Name to standardize: \"{name}\""
    )
}

pub fn suggest_title(name: &str, context: &str) -> String {
    format!(
        "Based on the name \"{name}\" and context \"{context}\", suggest a professional title or role.\n\
         Return only the suggested title, nothing else.\n\
         Examples:\n\
         - Name: \"Dr. Sarah Kim\", Context: \"hospital contacts\" → \"Physician\"\n\
         - Name: \"James Otieno\", Context: \"sales leads from a trade fair\" → \"Sales Manager\"\n\n\
         Name: \"{name}\"\n\
         Context: \"{context}\""
    )
}

pub fn clean_phone(phone: &str) -> String {
    format!(
        "Please clean and standardize this phone number by removing any plus signs, spaces, dashes, parentheses, and other non-numeric characters except for the country code if present.\n\
         Return only the cleaned phone number with no plus sign, nothing else.\n\
         Examples:\n\
         - \"+1 234-567-8900\" → \"12345678900\"\n\
         - \"+254 798 149 980\" → \"254798149980\"\n\
         - \"(555) 123-4567\" → \"5551234567\"\n\
         - \"+44 20 7946 0958\" → \"442079460958\"\n\n\
         Phone number to clean: \"{phone}\""
    )
}

/// Renders the header line plus the first rows as comma separated text.
pub fn csv_preview(headers: &[String], rows: &[Map<String, Value>]) -> String {
    let mut lines = vec![headers.join(",")];
    for row in rows.iter().take(CSV_PREVIEW_ROWS) {
        let cells: Vec<String> = headers
            .iter()
            .map(|header| match row.get(header) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

pub fn process_csv(headers: &[String], rows: &[Map<String, Value>], user_prompt: &str) -> String {
    let preview = csv_preview(headers, rows);
    let more = if rows.len() > CSV_PREVIEW_ROWS {
        format!("... and {} more rows", rows.len() - CSV_PREVIEW_ROWS)
    } else {
        String::new()
    };
    format!(
        "You are an AI assistant helping to clean and format CSV contact data. The user wants to prepare this data for import into a WhatsApp outreach system.\n\n\
         CSV Data (showing first 10 rows):\n\
         {preview}\n\n\
         {more}\n\n\
         User's request: \"{user_prompt}\"\n\n\
         Please analyze the data and provide specific suggestions for cleaning/formatting. Focus on:\n\
         1. Identifying the correct columns for name, title, and phone\n\
         2. Cleaning phone numbers (remove + signs, standardize format)\n\
         3. Standardizing names and titles\n\
         4. Removing duplicates or invalid rows\n\
         5. Any other data quality improvements\n\n\
         Return your response as a JSON object with:\n\
         - \"analysis\": brief analysis of the data\n\
         - \"suggestions\": array of specific actionable suggestions\n\
         - \"transformedData\": if you can suggest a cleaned version, provide the first 10 rows as an array of objects\n\n\
         Be specific and actionable in your suggestions."
    )
}

pub fn sentiment(message: &str) -> String {
    format!(
        "Analyze the sentiment of this WhatsApp reply to a marketing message.\n\
         Message: \"{message}\"\n\n\
         Respond with a JSON object only:\n\
         {{\"sentiment\": \"positive\" | \"negative\" | \"neutral\", \"confidence\": number between 0 and 1, \"explanation\": \"one short sentence\"}}"
    )
}

pub fn autoreply(
    user_message: &str,
    faq: &Faq,
    contact_name: Option<&str>,
    company_info: Option<&str>,
) -> String {
    let addressee = match contact_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!(" responding to {name}"),
        None => String::new(),
    };
    let company = match company_info.map(str::trim).filter(|c| !c.is_empty()) {
        Some(info) => format!("Company information: {info}"),
        None => String::new(),
    };
    format!(
        "You are a helpful customer service AI assistant{addressee}. A customer asked: \"{user_message}\"\n\n\
         Based on our FAQ knowledge, here's the relevant information:\n\
         Question: {question}\n\
         Answer: {answer}\n\n\
         {company}\n\n\
         Please provide a helpful, friendly, and personalized response that answers their question using the FAQ information. \
         Keep it concise and professional. Do not mention that you're using FAQ data - just provide the helpful answer.",
        question = faq.question,
        answer = faq.answer,
    )
}
