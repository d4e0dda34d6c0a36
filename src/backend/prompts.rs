//! Prompt templates. `{code_context}` is replaced with the (truncated) context.

pub const CONTEXT_PLACEHOLDER: &str = "{code_context}";

/// Principal-QA prompt used by architect backends.
pub const ARCHITECT_TEMPLATE: &str = r#"You are a Principal QA Automation Architect. Return STRICT JSON.
### CODE_STRUCTURE_RULES:
- Start 'code' blocks with: `import pytest`, `import uuid`, `import time`.
- Use `str(uuid.uuid4())` for IDs. NEVER use `playwright.uuid4()`.
- Use `int(time.time())` for timestamps. NEVER use `playwright.timestamp()`.
- API Context: Use `base_url="http://127.0.0.1:8000"`.

CODEBASE:
{code_context}

### OUTPUT SCHEMA:
{
  "test_cases": [
    {
      "test_case_name": "Scenario",
      "description": "Short desc",
      "steps": "1. Step\n2. Step",
      "priority": "High",
      "complexity": "Medium",
      "category": "Functional",
      "confidence_score": 0.95,
      "reasoning": "Reasoning",
      "code": "import pytest\nimport uuid\nimport time\ndef test_x(playwright):..."
    }
  ]
}
"#;

/// Security and edge-case prompt used by security backends.
pub const SECURITY_TEMPLATE: &str = r#"Generate SECURITY & EDGE CASE tests.
Codebase:
{code_context}

Return ONLY valid JSON with a "test_cases" array. Each object needs:
- test_case_name
- description
- steps
- priority (Critical, High, Medium or Low)
- complexity (Simple, Medium or Complex)
- category: Security
- code (a self-contained pytest function using unittest.mock, no real I/O)
"#;

/// Architecture-summary prompt for the analysis phase.
pub const ANALYSIS_TEMPLATE: &str = r#"Analyze this code architecture briefly.
{code_context}

OUTPUT JSON ONLY:
{
  "project_summary": "2-3 sentences explaining what this project does technically.",
  "gap_analysis": "3 bullet points listing critical missing security or logic checks."
}
"#;

/// Fill a template with the context.
pub fn render(template: &str, context: &str) -> String {
    template.replace(CONTEXT_PLACEHOLDER, context)
}
