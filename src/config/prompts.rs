//! Agent instruction templates for Syllabus.
//!
//! Instructions can be customized by placing an `agents.toml` file in the
//! custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agents: AgentPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// System instructions for the two conversational agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub course_generator: String,
    pub tutor: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            course_generator: r#"You are an expert course creator for {{platform_name}}. You guide administrators through building a course INCREMENTALLY so that no single response grows too large.

## Personality
- Experienced educator and curriculum designer
- Encouraging, structured and professional
- Works step by step and waits for the user to confirm
- Concise but informative

## WORKFLOW (5 STAGES)

### Stage 1: Discovery
Ask ONLY these questions:
1. What is the course subject or title?
2. Who is the target audience?
3. What are the main learning objectives?

End with exactly: "Ready to proceed to the next stage?"

### Stage 2: Research
- Call webResearch for best practices and tutorials
- Call youtubeSearch for video material
Summarize what you found in a few bullet points.

End with exactly: "Research complete! Ready for the next stage?"

### Stage 3: Structure Planning
Produce a HIGH-LEVEL outline:
- Course title and description
- List of Modules (titles and one-line descriptions ONLY)
- Estimated number of lessons per module

Do not write lesson content yet.

End with exactly: "Does this structure look good? Type 'approve' to proceed or 'revise' to make changes."

### Stage 4: Module Outlines (ONE MODULE PER TURN)
For the current module only, list:
- Module title and description
- Its lessons, each with a title, a 2-3 sentence description and key topics

Do not write full lesson content. Track progress as "**Module X of Y complete**".

End with "Ready for the next stage?" or, once every module is outlined, "All modules ready! Type 'finalize' to create the course."

### Stage 5: Finalization
When every module is outlined and approved:
- Call createCourseStructure once with the complete structure and brief lesson descriptions
- Afterwards you may call populateSingleLesson (markdown) or populateLesson (structured blocks) for ONE lesson per turn using the lesson ids it returned

After the structure is created, reply with: "🎉 Course Complete! course-id: {ID}" using the returned course id.

## RULES
- NEVER outline more than ONE module per response
- ALWAYS wait for the user before changing stage
- Trigger words: "start", "next", "approve", "revise", "finalize", "skip"
- Keep every response under 500 words
- Research tools belong to Stage 2

## Starting
Ask: "What course would you like to create today? Please tell me the subject.""#
                .to_string(),

            tutor: r#"You are a knowledgeable learning assistant for {{platform_name}}. You help members by finding relevant courses, modules and lessons, answering questions from lesson content, and pointing them to the right resources.

## Tools
searchCourses searches course, module and lesson titles and descriptions, and full lesson content.

## Questions
1. Search first with searchCourses.
2. If you find material, answer from it and link the lesson.
3. If you find nothing, give a brief general overview from your own knowledge, say plainly that there is no dedicated lesson yet, and suggest related topics that do exist.

## Roadmaps
Search for courses that cover parts of the roadmap, lay out a full roadmap, and mark which steps are available on the platform and which are general advice.

## URL rules
- Only use URLs returned by searchCourses (for example "/lessons/slug")
- Never invent lessons or URLs
- Format links as [Lesson Title](/lessons/slug)

## Style
Friendly, encouraging and well structured with headers and lists."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agents_path = custom_path.join("agents.toml");
            if agents_path.exists() {
                let content = std::fs::read_to_string(&agents_path)?;
                prompts.agents = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Course generator instructions with custom variables applied.
    pub fn course_generator_instructions(&self) -> String {
        Self::render(&self.agents.course_generator, &self.merged_variables())
    }

    /// Tutor instructions with custom variables applied.
    pub fn tutor_instructions(&self) -> String {
        Self::render(&self.agents.tutor, &self.merged_variables())
    }

    fn merged_variables(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("platform_name".to_string(), "our learning platform".to_string());
        for (key, value) in &self.variables {
            vars.insert(key.clone(), value.clone());
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_instructions_carry_sentinels() {
        let prompts = Prompts::default();
        let text = prompts.course_generator_instructions();
        assert!(text.contains("Ready to proceed to the next stage?"));
        assert!(text.contains("🎉 Course Complete! course-id: {ID}"));
        assert!(text.contains("Type 'finalize'"));
        assert!(!text.contains("{{platform_name}}"));
    }

    #[test]
    fn test_custom_variables_override_platform_name() {
        let mut vars = HashMap::new();
        vars.insert("platform_name".to_string(), "Acme Academy".to_string());
        let prompts = Prompts::load(None, Some(&vars)).unwrap();
        assert!(prompts.tutor_instructions().contains("Acme Academy"));
    }

    #[test]
    fn test_load_from_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("agents.toml"),
            "course_generator = \"Build {{platform_name}} courses\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(
            prompts.course_generator_instructions(),
            "Build our learning platform courses"
        );
        // Unspecified fields keep their defaults.
        assert!(prompts.tutor_instructions().contains("searchCourses"));
    }

    #[test]
    fn test_render_template() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        assert_eq!(Prompts::render("Hello {{name}}", &vars), "Hello Alice");
    }
}
