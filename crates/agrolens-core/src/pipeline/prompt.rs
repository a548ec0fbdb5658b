use serde_json::Value;

use super::profile::DomainProfile;
use super::{AnalysisRequest, Domain, Prompt};

/// Render the domain template for a validated request.
///
/// Templates embed no clock values or randomness, so identical input yields
/// byte-identical text. An image, when present, becomes a separate
/// attachment descriptor; only a fixed textual note about its existence
/// enters the template.
pub fn build(profile: &DomainProfile, request: &AnalysisRequest) -> Prompt {
    let text = match profile.domain {
        Domain::Climate => climate_text(request),
        Domain::Disease => disease_text(request),
        Domain::Market => market_text(request),
        Domain::Microplastic => microplastic_text(request),
        Domain::Voice => voice_text(request),
    };
    let attachments = request.image.iter().cloned().collect();
    Prompt { text, attachments }
}

fn climate_text(request: &AnalysisRequest) -> String {
    let district = request
        .fields
        .get("location_data")
        .and_then(|v| v.get("district"))
        .and_then(Value::as_str)
        .unwrap_or("Kerala");
    let mut text = format!(
        "As a climate and agricultural expert, analyze the current weather \
         conditions and provide detailed predictions for farming in Kerala, India.\n\
         \nLocation: {district}\n"
    );
    if let Some(Value::Object(weather)) = request.fields.get("current_weather") {
        text.push_str("\nCurrent conditions:\n");
        for key in ["temperature", "humidity", "rainfall_mm", "wind_speed", "pressure"] {
            if let Some(value) = weather.get(key) {
                text.push_str(&format!("- {key}: {value}\n"));
            }
        }
    }
    text.push_str(
        "\nProvide:\n\
         1. 7-day weather outlook\n\
         2. Agricultural recommendations for next week\n\
         3. Best crops to plant in current conditions\n\
         4. Irrigation scheduling advice\n\
         5. Pest and disease risk assessment\n\
         6. Alert level (low/medium/high) with reasons\n\
         \nFocus on actionable advice for farmers.",
    );
    text
}

fn disease_text(request: &AnalysisRequest) -> String {
    let crop = request.field_str("crop_name").unwrap_or_default();
    let mut text = format!("Analyze this crop disease case for {crop}.\n");
    if let Some(symptoms) = request.field_str("symptoms") {
        text.push_str(&format!("Observed symptoms: {symptoms}\n"));
    }
    if request.image.is_some() {
        text.push_str("An image has been provided for analysis.\n");
    }
    text.push_str(
        "\nProvide a detailed diagnosis including:\n\
         1. Most likely disease(s)\n\
         2. Confidence level (0-100%)\n\
         3. Detailed treatment recommendations\n\
         4. Prevention measures\n\
         5. When to seek expert help\n\
         \nFormat your response as a structured analysis suitable for a farmer \
         in Kerala, India.",
    );
    text
}

fn market_text(request: &AnalysisRequest) -> String {
    let crop = request.field_str("crop_name").unwrap_or_default();
    let location = request.field_str("market_location").unwrap_or("Kerala");
    let mut text = format!(
        "As a market analysis expert, provide comprehensive market intelligence \
         for {crop} in {location}, India.\n"
    );
    if let Some(Value::Object(price)) = request.fields.get("price_data") {
        text.push_str("\nCurrent market data:\n");
        for key in ["current_price", "price_change", "volume_traded"] {
            if let Some(value) = price.get(key) {
                text.push_str(&format!("- {key}: {value}\n"));
            }
        }
    }
    text.push_str(
        "\nProvide detailed analysis including:\n\
         1. Price trend analysis (short-term and seasonal)\n\
         2. Factors affecting current prices\n\
         3. Best time to sell recommendations\n\
         4. Market demand forecast\n\
         5. Quality requirements and grading\n\
         6. Alternative markets to consider\n\
         7. Price predictions for next 30 days\n\
         8. Risk assessment and mitigation strategies\n\
         \nFocus on actionable insights for farmers to maximize their profits.",
    );
    text
}

fn microplastic_text(request: &AnalysisRequest) -> String {
    let sample_type = request.field_str("sample_type").unwrap_or_default();
    let sample = request
        .fields
        .get("sample_data")
        .cloned()
        .unwrap_or(Value::Null);
    let mut text = format!(
        "As an environmental and agricultural expert, analyze this {sample_type} \
         sample for microplastic contamination.\n\
         \nSample details: {sample}\n"
    );
    if request.image.is_some() {
        text.push_str("Microscopic image provided for analysis.\n");
    }
    text.push_str(
        "\nProvide comprehensive analysis including:\n\
         1. Microplastic contamination assessment\n\
         2. Risk level (low/medium/high/critical)\n\
         3. Potential sources of contamination\n\
         4. Health and environmental implications\n\
         5. Immediate safety recommendations\n\
         6. Long-term mitigation strategies\n\
         7. Monitoring frequency recommendations\n\
         8. Regulatory compliance status\n\
         9. Alternative practices to reduce contamination\n\
         \nFocus on practical, actionable advice for farmers in Kerala, India \
         to protect soil health and crop safety.",
    );
    text
}

fn voice_text(request: &AnalysisRequest) -> String {
    let query = request.field_str("query").unwrap_or_default();
    let language = match request.field_str("language") {
        Some("ml") => "Malayalam",
        _ => "English",
    };
    format!(
        "You are an agricultural expert assistant for farmers in Kerala, India. \
         Answer the following farming question in {language}: {query}\n\
         Provide practical, actionable advice specific to Kerala's climate and \
         farming conditions. Keep the response concise and helpful."
    )
}
