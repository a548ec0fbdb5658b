use once_cell::sync::Lazy;

use super::extract::FieldSpec;
use super::Domain;

/// Model generation parameters carried per domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Static configuration for one analysis domain: what validation requires,
/// how the model is parameterized, which markers are recovered from its
/// output, and where results land.
pub struct DomainProfile {
    pub domain: Domain,
    /// Fields checked by validation after `farmer_id`, in reporting order.
    pub required_fields: &'static [&'static str],
    pub generation: GenerationParams,
    /// Extraction markers, searched in table order. May be empty.
    pub field_specs: Vec<FieldSpec>,
    /// Persistence table the domain appends to.
    pub table: &'static str,
    /// JSON key the raw analysis text is returned under.
    pub response_key: &'static str,
}

static PROFILES: Lazy<[DomainProfile; 5]> = Lazy::new(|| {
    [
        DomainProfile {
            domain: Domain::Climate,
            required_fields: &["location_data"],
            generation: GenerationParams {
                temperature: 0.4,
                max_output_tokens: 2000,
            },
            field_specs: vec![FieldSpec::choice(
                "alert_level",
                r"alert level[:\s]*(low|medium|high)",
                "medium",
            )
            .expect("static marker pattern compiles")],
            table: "climate_predictions",
            response_key: "predictions",
        },
        DomainProfile {
            domain: Domain::Disease,
            required_fields: &["crop_name"],
            generation: GenerationParams {
                temperature: 0.3,
                max_output_tokens: 2000,
            },
            field_specs: vec![FieldSpec::fraction(
                "confidence_score",
                r"confidence[:\s]*(\d+)%",
                0.75,
            )
            .expect("static marker pattern compiles")],
            table: "disease_detections",
            response_key: "diagnosis",
        },
        DomainProfile {
            domain: Domain::Market,
            required_fields: &["crop_name"],
            generation: GenerationParams {
                temperature: 0.3,
                max_output_tokens: 2000,
            },
            field_specs: Vec::new(),
            table: "market_intelligence",
            response_key: "market_analysis",
        },
        DomainProfile {
            domain: Domain::Microplastic,
            required_fields: &["sample_type", "sample_data"],
            generation: GenerationParams {
                temperature: 0.2,
                max_output_tokens: 2000,
            },
            field_specs: vec![FieldSpec::choice(
                "contamination_risk",
                r"risk level[:\s]*(low|medium|high|critical)",
                "medium",
            )
            .expect("static marker pattern compiles")],
            table: "microplastic_detections",
            response_key: "analysis",
        },
        DomainProfile {
            domain: Domain::Voice,
            required_fields: &["query"],
            generation: GenerationParams {
                temperature: 0.7,
                max_output_tokens: 1000,
            },
            field_specs: Vec::new(),
            table: "voice_queries",
            response_key: "response",
        },
    ]
});

impl DomainProfile {
    /// Profile lookup. `Domain`'s declaration order matches the table.
    pub fn get(domain: Domain) -> &'static DomainProfile {
        &PROFILES[domain as usize]
    }
}
