//! Oracle role strings for each analysis stage.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleRole {
    Visualization,
    CodeGen,
    Insights,
    Critique,
}

pub fn role_text(role: OracleRole) -> String {
    match role {
        OracleRole::Visualization => "You are a data visualization expert. Analyze datasets and suggest insightful graphs that reveal key trends and patterns. Provide responses in JSON format with the following structure:\n{\n    \"graphs\": [\n        {\n            \"title\": \"Graph Title\",\n            \"description\": \"What the graph shows\",\n            \"type\": \"bar/line/scatter/heatmap\",\n            \"x\": \"x_column_name\",\n            \"y\": \"y_column_name\",\n            \"hue\": \"grouping_column_name (optional)\"\n        }\n    ]\n}".to_string(),
        OracleRole::CodeGen =>
            "You are a data scientist.\nProvide only code as output without any description.\nProvide only code in plain text format without Markdown formatting.\nDo not include symbols such as ``` or ```python.\nEnsure the code is complete and runnable as-is.".to_string(),
        OracleRole::Insights =>
            "You are a senior data analyst presenting insights to business executives.\nUse clear, non-technical language with bullet points where appropriate.".to_string(),
        OracleRole::Critique =>
            "You are an expert data analyst reviewing a colleague's analysis and visualizations.\nProvide your feedback in a constructive manner.".to_string(),
    }
}
