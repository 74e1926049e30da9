//! Prompt construction for contract analysis.

use contractlens_core::{ContractDocument, Part};

/// Characters of each contract included in the prompt.
pub const CONTRACT_EXCERPT_CHARS: usize = 2000;

pub const SYSTEM_PROMPT: &str = "You are an expert contract analyst with deep knowledge of \
procurement, legal compliance, and negotiation strategies. Provide structured, actionable \
insights in JSON format.";

const RESPONSE_SCHEMA: &str = r#"{
  "dateRangeOfContracts": "Brief description of contract date ranges",
  "keyClausesIdentification": {
    "confidentiality": "Brief explanation of confidentiality clauses",
    "terminationConditions": "Brief explanation of termination conditions",
    "paymentTerms": "Brief explanation of payment terms",
    "liabilitiesAndIndemnities": "Brief explanation of liabilities and indemnities",
    "penaltiesAndSLAs": "Brief explanation of penalties and SLAs",
    "disputeResolution": "Brief explanation of dispute resolution"
  },
  "riskAssessmentAndMitigation": {
    "identifiedRisks": ["List of major identified risks"],
    "recommendationsToMitigateRisks": ["Clear actionable recommendations"]
  },
  "contractBenchmarkingAndPrecedentBasedInsights": {
    "industryBenchmarkComparison": "Clearly state alignment/deviation from industry standards",
    "insightsFromPreviousNegotiations": "Brief insights based on historical data"
  },
  "negotiationLeveragePoints": {
    "keyLeveragePoints": ["Clearly list leverage points"],
    "recommendedNegotiationTactics": ["Provide specific negotiation strategies"]
  },
  "complianceCheck": {
    "regulatoryComplianceStatus": "Clearly indicate compliance or non-compliance, specifying issues"
  },
  "summaryAndStrategicRecommendations": {
    "keyInsights": ["List major insights"],
    "recommendedActions": ["Clearly numbered steps or actions"],
    "nextSteps": ["Actionable immediate steps"]
  }
}"#;

const NOT_SPECIFIED: &str = "Not specified";

/// Build the analysis prompt for one part and its supplier's contracts.
///
/// Output depends only on the inputs, so identical inputs give identical prompts.
pub fn build_prompt(part: &Part, contracts: &[ContractDocument]) -> String {
    let record = &part.record;
    let supplier = part.supplier();
    let or_unset = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_SPECIFIED.to_string());

    let current_price = part
        .current_pricing
        .latest_price
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Not available".to_string());

    let documents = contracts
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "\nContract {n}:\n{excerpt}\n",
                n = i + 1,
                excerpt = doc.excerpt(CONTRACT_EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert AI Strategic Supplier Contract Analyst. Your main objective is to \
         analyze supplier contracts and provide strategic insights for procurement teams.\n\
         \n\
         PART INFORMATION:\n\
         - Part Number: {part_number}\n\
         - Part Name: {part_name}\n\
         - Material: {material}\n\
         - Currency: {currency}\n\
         - Current Price: {current_price} {currency}\n\
         \n\
         SUPPLIER INFORMATION:\n\
         - Supplier Name: {supplier_name}\n\
         - Supplier Number: {supplier_number}\n\
         - Contact: {contact_name} ({contact_email})\n\
         - Manufacturing Location: {location}\n\
         \n\
         CONTRACT DOCUMENTS ({count} contracts found):\n\
         {documents}\n\
         \n\
         Please analyze these contracts and provide a structured response in the following \
         JSON format:\n\
         \n\
         {schema}\n\
         \n\
         Focus on providing practical, actionable insights that can help in contract \
         negotiations. Be specific and concise in your analysis.",
        part_number = record.part_number,
        part_name = or_unset(&record.part_name),
        material = or_unset(&record.material),
        currency = or_unset(&record.currency),
        supplier_name = supplier.name,
        supplier_number = or_unset(&supplier.number),
        contact_name = or_unset(&supplier.contact_name),
        contact_email = or_unset(&supplier.contact_email),
        location = or_unset(&supplier.manufacturing_location),
        count = contracts.len(),
        schema = RESPONSE_SCHEMA,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use contractlens_core::{ContractMetadata, Month, PartRecord};
    use serde_json::json;

    fn part() -> Part {
        let row = json!({
            "PartNumber": "PA-10183",
            "partname": "Hydraulic valve",
            "material": "Steel",
            "currency": "EUR",
            "suppliername": "Acme Corp",
            "suppliernumber": "S-1",
            "suppliercontactname": "Jane Roe",
            "suppliercontactemail": "jane@acme.example",
            "pricemar2025": 12.5,
        });
        Part::derive(PartRecord::from_columns(row.as_object().unwrap()).unwrap(), Month::Jun)
    }

    fn doc(content: String) -> ContractDocument {
        ContractDocument {
            id: None,
            content,
            similarity: 0.0,
            metadata: ContractMetadata::default(),
        }
    }

    #[test]
    fn prompt_lists_part_and_supplier() {
        let prompt = build_prompt(&part(), &[]);
        assert!(prompt.contains("- Part Number: PA-10183"));
        assert!(prompt.contains("- Current Price: 12.5 EUR"));
        assert!(prompt.contains("- Contact: Jane Roe (jane@acme.example)"));
        assert!(prompt.contains("- Manufacturing Location: Not specified"));
        assert!(prompt.contains("CONTRACT DOCUMENTS (0 contracts found):"));
        assert!(prompt.contains("\"penaltiesAndSLAs\""));
        assert!(prompt.contains("\"dateRangeOfContracts\""));
    }

    #[test]
    fn prompt_truncates_long_contracts() {
        let long = "x".repeat(CONTRACT_EXCERPT_CHARS + 500);
        let prompt = build_prompt(&part(), &[doc("short one".into()), doc(long)]);
        assert!(prompt.contains("Contract 1:\nshort one\n"));
        let expected = format!("Contract 2:\n{}...\n", "x".repeat(CONTRACT_EXCERPT_CHARS));
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"x".repeat(CONTRACT_EXCERPT_CHARS + 1)));
    }

    #[test]
    fn prompt_is_deterministic() {
        let docs = vec![doc("Payment terms: net 30".into())];
        assert_eq!(build_prompt(&part(), &docs), build_prompt(&part(), &docs));
    }

    #[test]
    fn missing_price_reads_not_available() {
        let row = json!({"PartNumber": "PA-00001", "suppliername": "Globex"});
        let part = Part::derive(PartRecord::from_columns(row.as_object().unwrap()).unwrap(), Month::Jan);
        let prompt = build_prompt(&part, &[]);
        assert!(prompt.contains("- Current Price: Not available Not specified"));
    }
}
