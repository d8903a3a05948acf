// src/ai/prompts.rs
//! Prompt templates. Each one embeds the literal JSON structure the matching
//! schema in `crate::types` expects back.

use super::{ChatTurn, TurnRole};
use crate::types::{ChatMessage, ChatRole};

pub fn analysis_prompt(job_description: &str, resume_text: &str) -> String {
    format!(
        r#"Analyze the following resume against the job description. Your response MUST be a valid JSON object that strictly adheres to the following structure:
{{
  "strengths": ["An array of 3 to 5 strings showcasing the candidate's key strengths for this role."],
  "gaps": ["An array of 3 to 5 strings identifying where the resume is weak for this specific job."],
  "atsScore": 85,
  "suggestions": ["An array of exactly 2 actionable string suggestions to improve the resume."]
}}
"atsScore" is an integer between 0 and 100.
Job Description: --- {} ---
Resume Text: --- {} ---"#,
        job_description, resume_text
    )
}

pub fn career_paths_prompt(strengths: &[String], gaps: &[String]) -> String {
    format!(
        r#"Based on the following resume analysis, generate 3-5 tailored career path recommendations for a student in India. Your response MUST be a JSON object that strictly adheres to this structure:
{{
  "careerPaths": [
    {{
      "title": "The job title (e.g., 'Data Scientist')",
      "description": "A brief, compelling 1-2 sentence description of why this is a good fit.",
      "matchScore": 80,
      "avgSalary": "A realistic average salary range for this role in India (e.g., '₹8,00,000 - ₹15,00,000')."
    }}
  ]
}}
"matchScore" is an integer between 0 and 100 indicating how well the user's strengths align with this career.
Resume Analysis:
---
Strengths: {}
Gaps to address: {}
---"#,
        strengths.join(", "),
        gaps.join(", ")
    )
}

pub fn roadmap_prompt(career_title: &str, strengths: &[String], gaps: &[String]) -> String {
    format!(
        r#"You are an expert AI Career Strategist. A student in India has the following strengths and gaps and wants to pursue a career as a "{}".
Your task is to generate a detailed, actionable roadmap with at least 3 sections. The response MUST be a JSON object structured as:
{{
  "roadmap": [
    {{
      "sectionTitle": "Phase 1: Title",
      "steps": [
        {{
          "title": "Specific step title",
          "description": "A 1-2 sentence explanation.",
          "resourceLink": "A relevant absolute URL, or null."
        }}
      ]
    }}
  ]
}}
Strengths: {}
Gaps: {}"#,
        career_title,
        strengths.join(", "),
        gaps.join(", ")
    )
}

/// One line per message, `Candidate:` for the user and `Interviewer:` for the model.
pub fn transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|msg| {
            let speaker = match msg.role {
                ChatRole::User => "Candidate",
                ChatRole::Assistant => "Interviewer",
            };
            format!("{}: {}", speaker, msg.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn feedback_prompt(interview_context: &str, messages: &[ChatMessage]) -> String {
    format!(
        r#"You are an expert AI Career Coach reviewing an interview transcript. The interview was for a "{}" role.
Analyze the entire transcript provided below and generate a final feedback report.

Your response MUST be a JSON object that strictly adheres to the following structure:
{{
  "overallScore": 75,
  "summary": "A brief, 2-3 sentence summary of the candidate's performance.",
  "strengths": ["An array of at least 2 strings highlighting what the candidate did well."],
  "areasForImprovement": ["An array of at least 2 strings with constructive advice on what to improve."]
}}
"overallScore" is an integer from 0 to 100 representing the candidate's overall performance.

Transcript:
---
{}
---"#,
        interview_context,
        transcript(messages)
    )
}

pub fn interviewer_system_prompt(interview_context: &str) -> String {
    format!(
        "You are Kai, an expert AI Interview Coach for CareerTwin. Your task is to conduct a professional interview for a \"{}\" role. Ask one question at a time. Keep your questions clear and concise. After the user answers, provide a short, encouraging follow-up and then ask the next relevant question. Begin the interview now.",
        interview_context
    )
}

/// Conversation sent upstream for a chat turn: the prior history, the
/// interviewer instructions as a model turn, then the latest message.
pub fn interview_turns(messages: &[ChatMessage], interview_context: &str) -> Vec<ChatTurn> {
    let to_turn = |msg: &ChatMessage| ChatTurn {
        role: match msg.role {
            ChatRole::User => TurnRole::User,
            ChatRole::Assistant => TurnRole::Model,
        },
        text: msg.content.clone(),
    };

    let split = messages.len().saturating_sub(1);
    let mut turns: Vec<ChatTurn> = messages[..split].iter().map(to_turn).collect();
    turns.push(ChatTurn {
        role: TurnRole::Model,
        text: interviewer_system_prompt(interview_context),
    });
    turns.extend(messages[split..].iter().map(to_turn));
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_prompt_embeds_inputs_and_shape() {
        let prompt = analysis_prompt("Rust backend role", "Ten years of C++");
        assert!(prompt.contains("Job Description: --- Rust backend role ---"));
        assert!(prompt.contains("Resume Text: --- Ten years of C++ ---"));
        assert!(prompt.contains("\"atsScore\""));
        assert!(prompt.contains("exactly 2"));
    }

    #[test]
    fn test_career_paths_prompt_joins_lists() {
        let prompt = career_paths_prompt(
            &["SQL".to_string(), "Python".to_string()],
            &["Public speaking".to_string()],
        );
        assert!(prompt.contains("Strengths: SQL, Python"));
        assert!(prompt.contains("Gaps to address: Public speaking"));
        assert!(prompt.contains("\"careerPaths\""));
    }

    #[test]
    fn test_roadmap_prompt_quotes_title() {
        let prompt = roadmap_prompt("Data Engineer", &[], &[]);
        assert!(prompt.contains("a career as a \"Data Engineer\""));
        assert!(prompt.contains("\"resourceLink\""));
    }

    #[test]
    fn test_transcript_labels_speakers() {
        let text = transcript(&[
            ChatMessage::assistant("Why this role?"),
            ChatMessage::user("I like distributed systems."),
        ]);
        assert_eq!(
            text,
            "Interviewer: Why this role?\nCandidate: I like distributed systems."
        );
    }

    #[test]
    fn test_interview_turns_insert_instructions_before_last_message() {
        let turns = interview_turns(
            &[
                ChatMessage::user("Hi"),
                ChatMessage::assistant("Welcome! First question?"),
                ChatMessage::user("Sure"),
            ],
            "Software Engineer",
        );
        let roles: Vec<TurnRole> = turns.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::User, TurnRole::Model, TurnRole::Model, TurnRole::User]
        );
        assert!(turns[2].text.contains("\"Software Engineer\" role"));
        assert_eq!(turns[3].text, "Sure");
    }

    #[test]
    fn test_interview_turns_with_single_message() {
        let turns = interview_turns(&[ChatMessage::user("Hi")], "Analyst");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::Model);
        assert_eq!(turns[1].text, "Hi");
    }
}
