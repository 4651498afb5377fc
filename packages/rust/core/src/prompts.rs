//! Prompt templates, research queries, and sampling parameters.
//!
//! Every prompt sent by a stage executor is built here. The markdown table
//! structures live in `templates/` and are embedded at compile time.
//! [`template_version`] fingerprints the rendered wording so that any change
//! to a prompt lands in a fresh cache scope.

use std::sync::LazyLock;

use courseforge_shared::{CourseRequest, content_digest};

use crate::decompose::ModuleRecord;

pub const OBJECTIVES_TEMPLATE: &str = include_str!("../templates/objectives.md");
pub const AUDIENCE_TEMPLATE: &str = include_str!("../templates/audience.md");
pub const RESOURCES_TEMPLATE: &str = include_str!("../templates/resources.md");
pub const SYLLABUS_TEMPLATE: &str = include_str!("../templates/syllabus.md");
pub const SLIDES_PLAN_TEMPLATE: &str = include_str!("../templates/slides_plan.md");
pub const ASSESSMENT_PLAN_TEMPLATE: &str = include_str!("../templates/assessment_plan.md");

/// Length of the template fingerprint folded into cache keys.
const TEMPLATE_VERSION_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Sampling parameters
// ---------------------------------------------------------------------------

/// Token budget and temperature for one kind of generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Sampling {
    const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

pub const OBJECTIVES: Sampling = Sampling::new(5000, 0.5);
pub const AUDIENCE: Sampling = Sampling::new(5000, 0.5);
pub const RESOURCES: Sampling = Sampling::new(5000, 0.5);
pub const SYLLABUS: Sampling = Sampling::new(5000, 0.5);
pub const SLIDES_PLAN: Sampling = Sampling::new(5000, 0.6);
pub const ASSESSMENT_PLAN: Sampling = Sampling::new(5000, 0.5);
pub const MODULE_SCRIPT: Sampling = Sampling::new(5000, 0.6);
pub const MODULE_SLIDES: Sampling = Sampling::new(5000, 0.6);
pub const MODULE_ASSESSMENT: Sampling = Sampling::new(5000, 0.6);
pub const DECOMPOSITION: Sampling = Sampling::new(6000, 0.2);

// ---------------------------------------------------------------------------
// Research queries
// ---------------------------------------------------------------------------

/// One query covering objectives, audience, and resources together.
pub fn shared_research_query(request: &CourseRequest) -> String {
    format!(
        "Research to inform Objectives, Audience, and Resource assessment for a course.\n\
         Course Name: {}\n\
         Course Description: {}\n\
         Initial Learning Objectives: {}\n\
         Include: domain trends, learner personas, prerequisite skills, common pitfalls, \
         accessibility, tooling/platforms, datasets, standards, and best practices.",
        request.course_name, request.course_description, request.learning_objectives
    )
}

pub fn objectives_query(request: &CourseRequest) -> String {
    format!(
        "Define clear learning objectives for a course.\nCourse: {}\nDesc: {}\nInitial Objectives: {}",
        request.course_name, request.course_description, request.learning_objectives
    )
}

pub fn audience_query(request: &CourseRequest) -> String {
    format!(
        "Analyze target learners for a course.\nCourse: {}\nDesc: {}\nObjectives: {}",
        request.course_name, request.course_description, request.learning_objectives
    )
}

pub fn resources_query(request: &CourseRequest) -> String {
    format!(
        "Identify resources for a course (tools, platforms, time, SMEs, datasets, references).\n\
         Course: {}\nDesc: {}\nObjectives: {}",
        request.course_name, request.course_description, request.learning_objectives
    )
}

/// One query shared by the script, slides, and assessment of a module.
pub fn module_research_query(request: &CourseRequest, module: &ModuleRecord) -> String {
    format!(
        "Research to support developing teaching materials for one course module.\n\
         Course: {}\nModule: {}\nOutline: {}\n\
         Include: worked examples, common misconceptions, practical exercises, and current tools.",
        request.course_name, module.title, module.script
    )
}

// ---------------------------------------------------------------------------
// Analyze prompts
// ---------------------------------------------------------------------------

pub fn objectives_prompt(request: &CourseRequest, context: &str) -> String {
    format!(
        "Produce ONLY the Objectives definition following this EXACT structure:\n\n\
         {OBJECTIVES_TEMPLATE}\n\
         Course Name: {}\n\
         Course Description: {}\n\
         Provided Learning Objectives: {}\n\
         Additional Context: {context}\n\n\
         Replace the bracketed placeholders with specific, measurable outcomes. \
         Maintain the markdown formatting exactly as shown.",
        request.course_name, request.course_description, request.learning_objectives
    )
}

pub fn audience_prompt(request: &CourseRequest, context: &str) -> String {
    format!(
        "Produce ONLY the Audience analysis following this EXACT structure:\n\n\
         {AUDIENCE_TEMPLATE}\n\
         Course Name: {}\n\
         Course Description: {}\n\
         Learning Objectives: {}\n\
         Additional Context: {context}\n\n\
         Replace the bracketed placeholders with specific audience insights. \
         Maintain the markdown formatting exactly as shown.",
        request.course_name, request.course_description, request.learning_objectives
    )
}

pub fn resources_prompt(request: &CourseRequest, context: &str) -> String {
    format!(
        "Produce ONLY the Resource assessment following this EXACT structure:\n\n\
         {RESOURCES_TEMPLATE}\n\
         Course Name: {}\n\
         Course Description: {}\n\
         Learning Objectives: {}\n\
         Additional Context: {context}\n\n\
         Replace the bracketed placeholders with specific resource requirements. \
         Maintain the markdown formatting exactly as shown.",
        request.course_name, request.course_description, request.learning_objectives
    )
}

/// Joined analysis text handed to the Design stage.
pub fn combined_analysis(objectives: &str, audience: &str, resources: &str) -> String {
    format!("Objectives:\n{objectives}\n\nAudience:\n{audience}\n\nResources:\n{resources}")
}

// ---------------------------------------------------------------------------
// Design prompts
// ---------------------------------------------------------------------------

pub fn syllabus_prompt(analysis: &str) -> String {
    format!(
        "Produce ONLY the Syllabus design following this EXACT table structure:\n\n\
         {SYLLABUS_TEMPLATE}\n\
         Analysis: {analysis}\n\n\
         Replace ALL bracketed placeholders with specific module information, durations, and \
         prerequisites based on the analysis. Maintain the markdown table formatting exactly as \
         shown with proper alignment."
    )
}

pub fn slides_plan_prompt(analysis: &str) -> String {
    format!(
        "Produce ONLY the Slide planning following this EXACT table structure:\n\n\
         {SLIDES_PLAN_TEMPLATE}\n\
         Analysis: {analysis}\n\n\
         Replace ALL bracketed placeholders with specific slide titles, 3-5 key points per slide \
         using bullet format (• followed by <br>), and detailed visual suggestions. Maintain the \
         markdown table formatting exactly as shown."
    )
}

pub fn assessment_plan_prompt(analysis: &str) -> String {
    format!(
        "Produce ONLY the Assessment planning following this EXACT table structure:\n\n\
         {ASSESSMENT_PLAN_TEMPLATE}\n\
         Analysis: {analysis}\n\n\
         Replace ALL bracketed placeholders with specific assessment names, formats, durations, \
         objectives measured, weights, and rubric criteria based on the analysis. Maintain the \
         markdown table formatting exactly as shown."
    )
}

// ---------------------------------------------------------------------------
// Decomposition prompt
// ---------------------------------------------------------------------------

pub fn decomposition_prompt(syllabus: &str, slides_plan: &str, assessment_plan: &str) -> String {
    format!(
        "Split the course design below into its modules.\n\n\
         Return ONLY a JSON array. Each element is an object with exactly these string keys:\n\
         - \"title\": the module title as it appears in the syllabus\n\
         - \"script\": the module's content outline from the syllabus\n\
         - \"slides\": the module's rows from the slide planning\n\
         - \"assessment\": the module's rows from the assessment planning\n\
         Keep modules in syllabus order. Do not add commentary before or after the array.\n\n\
         Syllabus:\n{syllabus}\n\n\
         Slide planning:\n{slides_plan}\n\n\
         Assessment planning:\n{assessment_plan}"
    )
}

// ---------------------------------------------------------------------------
// Develop prompts
// ---------------------------------------------------------------------------

pub fn module_script_prompt(module: &ModuleRecord, context: &str) -> String {
    format!(
        "Only produce the Script for the chapter: \"{}\".\n\
         Include speaking notes, key explanations, and timing cues.\n\
         Use concise sections.\n\
         Design: {}\n\
         Additional Context: {context}",
        module.title,
        module.design_text()
    )
}

pub fn module_slides_prompt(module: &ModuleRecord, script: &str, context: &str) -> String {
    format!(
        "Only produce the Slides outline for the chapter: \"{}\".\n\
         Provide slide titles, 3-5 bullets each, and visual/diagram suggestions.\n\
         Keep the slides consistent with the script below.\n\
         Design: {}\n\
         Script: {script}\n\
         Additional Context: {context}",
        module.title,
        module.design_text()
    )
}

pub fn module_assessment_prompt(
    module: &ModuleRecord,
    script: &str,
    slides: &str,
    context: &str,
) -> String {
    format!(
        "Only produce the Assessment questions for the chapter: \"{}\".\n\
         Include a mix of item types (MCQ, short answer, practical task), answer keys, and \
         mapping to objectives.\n\
         Only assess material covered by the script and slides below.\n\
         Design: {}\n\
         Script: {script}\n\
         Slides: {slides}\n\
         Additional Context: {context}",
        module.title,
        module.design_text()
    )
}

/// Joined module materials stored as `combined`.
pub fn combined_module(script: &str, slides: &str, assessment: &str) -> String {
    format!("Script:\n{script}\n\nSlides:\n{slides}\n\nAssessment:\n{assessment}")
}

// ---------------------------------------------------------------------------
// Template fingerprint
// ---------------------------------------------------------------------------

static TEMPLATE_VERSION: LazyLock<String> = LazyLock::new(|| {
    let probe = CourseRequest::new("{name}", "{description}", "{objectives}", true);
    let module = ModuleRecord {
        title: "{title}".into(),
        script: "{script}".into(),
        slides: "{slides}".into(),
        assessment: "{assessment}".into(),
    };
    let rendered = [
        shared_research_query(&probe),
        objectives_query(&probe),
        audience_query(&probe),
        resources_query(&probe),
        module_research_query(&probe, &module),
        objectives_prompt(&probe, "{context}"),
        audience_prompt(&probe, "{context}"),
        resources_prompt(&probe, "{context}"),
        combined_analysis("{o}", "{a}", "{r}"),
        syllabus_prompt("{analysis}"),
        slides_plan_prompt("{analysis}"),
        assessment_plan_prompt("{analysis}"),
        decomposition_prompt("{syllabus}", "{slides}", "{assessment}"),
        module_script_prompt(&module, "{context}"),
        module_slides_prompt(&module, "{script}", "{context}"),
        module_assessment_prompt(&module, "{script}", "{slides}", "{context}"),
        combined_module("{script}", "{slides}", "{assessment}"),
    ]
    .join("\u{1f}");

    let mut digest = content_digest(&rendered);
    digest.truncate(TEMPLATE_VERSION_LEN);
    digest
});

/// Fingerprint of every prompt's wording.
pub fn template_version() -> &'static str {
    &TEMPLATE_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agile() -> CourseRequest {
        CourseRequest::new(
            "Agile and Scrum",
            "Introduce approaches to project management.",
            "Understand Agile principles, Implement Scrum",
            true,
        )
    }

    #[test]
    fn templates_are_embedded() {
        assert!(OBJECTIVES_TEMPLATE.starts_with("## Learning Objectives"));
        assert!(AUDIENCE_TEMPLATE.starts_with("## Audience Analysis"));
        assert!(RESOURCES_TEMPLATE.starts_with("## Resource Assessment"));
        assert!(SYLLABUS_TEMPLATE.starts_with("## Course Syllabus"));
        assert!(SLIDES_PLAN_TEMPLATE.starts_with("## Slide Planning"));
        assert!(ASSESSMENT_PLAN_TEMPLATE.starts_with("## Assessment Planning"));
    }

    #[test]
    fn analyze_prompts_carry_inputs_and_context() {
        let prompt = objectives_prompt(&agile(), "CTX-123");
        assert!(prompt.contains("Course Name: Agile and Scrum"));
        assert!(prompt.contains("Provided Learning Objectives: Understand Agile principles"));
        assert!(prompt.contains("Additional Context: CTX-123"));
        assert!(prompt.contains("### Primary Objectives"));
    }

    #[test]
    fn stage_queries_differ() {
        let req = agile();
        let queries = [
            shared_research_query(&req),
            objectives_query(&req),
            audience_query(&req),
            resources_query(&req),
        ];
        for (i, a) in queries.iter().enumerate() {
            for b in &queries[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn combined_analysis_layout() {
        assert_eq!(
            combined_analysis("o", "a", "r"),
            "Objectives:\no\n\nAudience:\na\n\nResources:\nr"
        );
    }

    #[test]
    fn module_assessment_sees_script_and_slides() {
        let module = ModuleRecord {
            title: "Sprint Planning".into(),
            script: "outline".into(),
            slides: "slide rows".into(),
            assessment: "quiz rows".into(),
        };
        let prompt = module_assessment_prompt(&module, "SCRIPT-TEXT", "SLIDES-TEXT", "");
        assert!(prompt.contains("\"Sprint Planning\""));
        assert!(prompt.contains("Script: SCRIPT-TEXT"));
        assert!(prompt.contains("Slides: SLIDES-TEXT"));
        assert!(prompt.contains("quiz rows"));
    }

    #[test]
    fn template_version_is_stable_hex() {
        let v = template_version();
        assert_eq!(v.len(), TEMPLATE_VERSION_LEN);
        assert!(v.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(v, template_version());
    }

    #[test]
    fn decomposition_sampling_is_cool() {
        assert!(DECOMPOSITION.temperature < OBJECTIVES.temperature);
        assert_eq!(SLIDES_PLAN.temperature, 0.6);
        assert_eq!(ASSESSMENT_PLAN.max_tokens, 5000);
    }
}
