//! CLI handlers for submitting work and listing grading-service resources.

use crate::api::{Course, Submission};
use crate::session::Session;

use super::{ListArgs, ListTarget, SubmitArgs};

/// Handle `decanter submit`.
pub async fn handle_submit(
    session: &Session,
    args: &SubmitArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let receipt = session
        .grader
        .submit_file(&args.course, &args.assessment, &args.file)
        .await?;
    println!(
        "📤 Submitted {} (version {})",
        receipt.filename, receipt.version
    );

    if !args.wait {
        return Ok(());
    }

    println!("⏳ Waiting for grading...");
    let submission = session
        .grader
        .wait_for_grade(&args.course, &args.assessment, session.config.result_poller())
        .await?;
    print_scores(&submission);
    Ok(())
}

/// Handle `decanter list <target>`.
pub async fn handle_list(
    session: &Session,
    args: &ListArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    match args.target {
        ListTarget::Me => {
            let user = session.grader.user_info().await?;
            println!("{} {}", user.first_name, user.last_name);
            println!("  Email: {}", user.email);
            for (label, value) in [
                ("School", &user.school),
                ("Major", &user.major),
                ("Year", &user.year),
            ] {
                if let Some(value) = value {
                    println!("  {label}: {value}");
                }
            }
        }
        ListTarget::Courses => {
            let courses = session.grader.courses().await?;
            for course in filter_semester(courses, args.semester.as_deref()) {
                println!(
                    "{:<24} {:<8} {}",
                    course.name, course.semester, course.display_name
                );
            }
        }
        ListTarget::Assessments => {
            let courses = match &args.course {
                Some(course) => vec![course.clone()],
                None => filter_semester(session.grader.courses().await?, args.semester.as_deref())
                    .into_iter()
                    .map(|c| c.name)
                    .collect(),
            };
            for course in courses {
                println!("{course}");
                for assessment in session.grader.assessments(&course).await? {
                    println!(
                        "  {:<24} due {}",
                        assessment.name,
                        assessment.due.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        ListTarget::Submissions => {
            let (Some(course), Some(assessment)) = (&args.course, &args.assessment) else {
                return Err("listing submissions needs --course and --assessment".into());
            };
            let mut submissions = session.grader.submissions(course, assessment).await?;
            if submissions.is_empty() {
                println!("No submissions yet.");
            }
            submissions.sort_by_key(|s| std::cmp::Reverse(s.version));
            for submission in &submissions {
                print_scores(submission);
            }
        }
    }
    Ok(())
}

/// Courses whose semester matches `semester`, case-insensitively.
fn filter_semester(courses: Vec<Course>, semester: Option<&str>) -> Vec<Course> {
    match semester {
        Some(semester) => courses
            .into_iter()
            .filter(|c| c.semester.eq_ignore_ascii_case(semester))
            .collect(),
        None => courses,
    }
}

fn print_scores(submission: &Submission) {
    println!(
        "Version {} {}{}",
        submission.version,
        submission.filename,
        submission
            .submitted_at
            .as_deref()
            .map(|at| format!(" ({at})"))
            .unwrap_or_default()
    );
    if !submission.is_graded() {
        println!("  not graded yet");
    }
    for (problem, score) in submission.sorted_scores() {
        println!("  {problem}: {score}");
    }
}
