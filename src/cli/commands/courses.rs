//! List courses in the content store.

use crate::cli::Output;
use crate::config::Settings;
use crate::content_store::{create_content_store, DocumentType};

/// Run the courses command.
pub async fn run_courses(settings: Settings) -> anyhow::Result<()> {
    let store = create_content_store(&settings)?;
    let courses = store.list(DocumentType::Course).await?;

    if courses.is_empty() {
        Output::info("No courses yet. Create one with: syllabus wizard");
        return Ok(());
    }

    Output::header(&format!("Courses ({})", courses.len()));
    println!();

    for course in &courses {
        let tier = course.text("tier").unwrap_or("free");
        let modules = course.references("modules").len();
        Output::course_info(course.title().unwrap_or("(untitled)"), &course.id, tier, modules);
        if let Some(slug) = course.slug() {
            Output::kv("Path", &format!("/courses/{}", slug));
        }
    }

    Ok(())
}
