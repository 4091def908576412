//! The ordered PXO step catalog.
//!
//! The order here is the dependency graph: every step's prompt embeds the
//! output of all steps before it, and later focus texts refer back to earlier
//! sections by title.

use serde::Serialize;

/// One step of the PXO workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    /// 0-based ordinal; defines execution order.
    pub id: usize,
    pub title: &'static str,
    pub subtitle: &'static str,
    /// Instructions describing what the model should produce for this step.
    #[serde(skip_serializing)]
    pub focus: &'static str,
}

/// Number of steps in the standard catalog.
pub const STEP_COUNT: usize = 12;

/// The standard 12-step PXO catalog.
pub const STEP_CATALOG: [StepDefinition; STEP_COUNT] = [
    StepDefinition {
        id: 0,
        title: "Problem Hypothesis",
        subtitle: "Before Empathy",
        focus: "Generate the Problem Hypothesis section. Include:
- Refined Problem Statement based on the screenshot
- Impacted User Segment
- Business Risk assessment
- Metric at Risk analysis
- Current User Alternatives visible in or implied by the interface
- Why Now reasoning
- Validated hypothesis statement
- Risk Level justification",
    },
    StepDefinition {
        id: 1,
        title: "Empathy Engine",
        subtitle: "User emotional landscape",
        focus: "Generate the Empathy Engine section. Include:
- **Think**: What users are thinking when using this interface
- **Feel**: Emotional responses, frustrations, and tensions
- **Say**: What users would literally say about this experience
- **Do**: Observable behaviors and patterns
- **Hidden Frictions**: Non-obvious pain points in the UI
- **Emotional Risks**: Where trust could break
- **Trust Barriers**: What prevents adoption or continued engagement",
    },
    StepDefinition {
        id: 2,
        title: "JTBD Extraction",
        subtitle: "Jobs to be done",
        focus: "Generate the JTBD Extraction section. Include:
- **Core Functional Job**: What the user is trying to accomplish
- **Emotional Job**: How they want to feel while doing it
- **Social Job**: How they want to be perceived
- **Job Steps** (chronological): Full sequence of steps to complete the job
- **Success Definition**: What job completion looks like
- **Failure Definition**: When and why the job fails",
    },
    StepDefinition {
        id: 3,
        title: "Constraint Mapping",
        subtitle: "Technical, data, legal, org",
        focus: "Generate the Constraint Mapping section. Include:
- **Technical Constraints**: Backend, model limits, performance, latency
- **Data Constraints**: Availability, reliability, ownership
- **Legal/Compliance**: Privacy, accessibility, regulatory
- **Organizational Constraints**: Team, process, or political limitations
- **Edge Cases**: Unusual but critical scenarios to handle",
    },
    StepDefinition {
        id: 4,
        title: "Persona Roles",
        subtitle: "Usage archetypes",
        focus: "Generate the Persona Roles section for three archetypes. For each:
- Motivation
- Risk tolerance
- Cognitive load tolerance
- UX expectation

**Naive**: First-time or occasional users
**Medium**: Regular users with growing familiarity
**Expert**: Power users who know the system deeply

Ground each persona in what you can infer from the screenshot and problem context.",
    },
    StepDefinition {
        id: 5,
        title: "Behavioral Trigger Design",
        subtitle: "Activation to control",
        focus: "Generate the Behavioral Trigger Design section. Include:
- **Activation Trigger**: What makes the user start using this feature
- **Aha Moment**: When does value become obvious
- **Competence Moment**: When does the user feel capable and smart
- **Control Moment**: When does the user feel safe and in control

Be specific to what you see in the screenshot and tie to the JTBD from the previous section.",
    },
    StepDefinition {
        id: 6,
        title: "Information Architecture",
        subtitle: "IA tree and task flows",
        focus: "Generate the Information Architecture section. Include:
- **IA Tree**: Hierarchical structure (Level 1 → Level 2 → Level 3)
- **Naive Task Flow**: Step-by-step for the naive persona
- **Medium Task Flow**: Step-by-step for the medium persona
- **Expert Task Flow**: Step-by-step for the expert persona

Base this on the actual interface visible in the screenshot and the personas from the previous section.",
    },
    StepDefinition {
        id: 7,
        title: "Failure Mode Design",
        subtitle: "What can break",
        focus: "Generate the Failure Mode Design section. Include:
- **Failure Modes**: Confusion, empty states, hallucination risk, permission errors, timeouts, partial results, with specific scenarios for this product
- **System Recovery Design**: For each failure mode, how should the system recover?
- **Graceful Degradation**: What happens when things partially fail

Be thorough and practical. Reference specific UI elements from the screenshot.",
    },
    StepDefinition {
        id: 8,
        title: "Metric Definition",
        subtitle: "Primary, secondary, signals",
        focus: "Generate the Metric Definition section. Include:
- **Primary Metric**: The single metric that defines success
- **Secondary Metrics**: 2-3 supporting metrics
- **Early Signal (7-day)**: Leading indicators in the first week post-launch
- **Long-Term Signal (30-day)**: Sustained behavior signals
- **Leading Indicators**: What predicts success before it's measurable

Tie directly to the Metric at Risk provided in the inputs and the hypothesis.",
    },
    StepDefinition {
        id: 9,
        title: "Low-Fi Specification",
        subtitle: "Layout, CTA, state logic",
        focus: "Generate the Low-Fi Specification section (no visual styling, structural only). Include:
- **Layout Structure**: How elements should be arranged on screen
- **Priority Hierarchy**: What gets visual weight and attention order
- **CTA Logic**: When and how calls-to-action appear
- **State Logic**: All states the UI can be in (loading, empty, error, success, partial)
- **Error States**: What errors look like and what copy they contain
- **Empty States**: What zero-data or first-time states look like

Base this on your IA from section 6 and the personas from section 4.",
    },
    StepDefinition {
        id: 10,
        title: "Heuristic & Cognitive Audit",
        subtitle: "Nielsen, cognitive load, accessibility",
        focus: "Generate the Heuristic & Cognitive Audit. Evaluate the interface against:

**Nielsen's 10 Heuristics**: for each relevant heuristic, list specific violations and improvements
**Cognitive Load Theory**: where does the interface overwhelm? How to reduce?
**Progressive Disclosure**: is complexity revealed at the right moment?
**Accessibility**: WCAG 2.1 considerations specific to this interface
**Error Prevention**: where could errors be prevented before they happen?

Format as: Heuristic → Violation → Improvement. Be specific to what you see in the screenshot.",
    },
    StepDefinition {
        id: 11,
        title: "Validation Loop",
        subtitle: "Before and after development",
        focus: "Generate the Validation Loop section.

**Before Development**: for each question, provide specific tests or methods:
- Does this reduce cognitive load? How to test?
- Does it improve job completion speed? How to measure?
- Does it reduce risk perception? How to validate?
- What to prototype and test first?

**After Release**: provide specific things to watch for:
- Behavior changes to monitor
- Metric movements expected (and thresholds)
- Unexpected failure modes to watch
- Iteration triggers: when to iterate vs. stay the course

Make this actionable and specific to the product context.",
    },
];

/// Check that ids are exactly `0..N-1` in order.
///
/// The runner relies on this to keep emitted section ids gap-free and
/// strictly increasing.
pub fn check_catalog(catalog: &[StepDefinition]) -> Result<(), String> {
    if catalog.is_empty() {
        return Err("catalog is empty".to_string());
    }
    for (position, step) in catalog.iter().enumerate() {
        if step.id != position {
            return Err(format!(
                "step {:?} has id {} but sits at position {}",
                step.title, step.id, position
            ));
        }
        if step.focus.trim().is_empty() {
            return Err(format!("step {} has no focus text", step.id));
        }
    }
    Ok(())
}
