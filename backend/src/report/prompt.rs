use shared::Predictions;

/// One `label: p` line per prediction, in the given order.
pub fn findings_text(predictions: &Predictions) -> String {
    predictions
        .iter()
        .map(|(label, prob)| format!("{}: {:.4}", label, prob))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn xray_prompt(predictions: &Predictions) -> String {
    format!(
        r#"
You are a medical AI assistant helping radiologists analyze chest X-rays.

The image shows a chest X-ray, and our model has detected the following probabilities for various conditions:

{findings}

Please provide a detailed analysis in markdown format with the following sections:

# Summary
A brief overview of the key findings

## Key Findings
- List the most significant findings
- Highlight critical values
- Note any concerning patterns

## Clinical Interpretation
Detailed interpretation of the findings, including:
- Primary concerns
- Potential diagnoses
- Pattern recognition

## Recommendations
1. Immediate actions required (if any)
2. Follow-up tests or examinations
3. Monitoring requirements

## Differential Diagnoses
- List potential diagnoses
- Order by likelihood
- Include supporting evidence

Please use markdown formatting including:
- Headers (# ## ###)
- Lists (- and 1. 2. 3.)
- **Bold** for emphasis
- *Italic* for medical terms
- > Blockquotes for important notes
"#,
        findings = findings_text(predictions)
    )
}

pub fn ctscan_prompt(predictions: &Predictions) -> String {
    format!(
        r#"
You are a medical AI assistant analyzing a CT scan.

The model has detected the following probabilities for conditions:

{findings}

Please provide a detailed analysis in markdown format with the following sections:

# Summary
A brief overview of the key findings

## Key Findings
- List the most significant findings
- Highlight critical values

## Clinical Interpretation
- Primary concerns
- Potential diagnoses
- Pattern recognition

## Recommendations
- Immediate actions required
- Follow-up tests

## Differential Diagnoses
- List potential diagnoses ordered by likelihood

Please use markdown formatting.
"#,
        findings = findings_text(predictions)
    )
}
