// src/types/analysis.rs
use crate::schema::{Shape, Validated};
use serde::{Deserialize, Serialize};

/// Resume-vs-job-description analysis returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub ats_score: u8,
    pub suggestions: Vec<String>,
}

impl Validated for AnalysisResult {
    fn shape() -> Shape {
        Shape::object([
            ("strengths", Shape::array(Shape::string()).between(3, 5)),
            ("gaps", Shape::array(Shape::string()).between(3, 5)),
            ("atsScore", Shape::integer().between(0, 100)),
            ("suggestions", Shape::array(Shape::string()).exactly(2)),
        ])
    }
}

/// Stored form of an analysis, under `users/{uid}/analyses/{timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnalysis {
    pub job_description: String,
    pub file_name: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerPath {
    pub title: String,
    pub description: String,
    pub match_score: u8,
    pub avg_salary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerPathsResponse {
    pub career_paths: Vec<CareerPath>,
}

impl Validated for CareerPathsResponse {
    fn shape() -> Shape {
        let path = Shape::object([
            ("title", Shape::string()),
            ("description", Shape::string()),
            ("matchScore", Shape::integer().between(0, 100)),
            ("avgSalary", Shape::string()),
        ]);
        Shape::object([("careerPaths", Shape::array(path).between(3, 5))])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapStep {
    pub title: String,
    pub description: String,
    pub resource_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapSection {
    pub section_title: String,
    pub steps: Vec<RoadmapStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    pub roadmap: Vec<RoadmapSection>,
}

impl Validated for Roadmap {
    fn shape() -> Shape {
        let step = Shape::object([
            ("title", Shape::string()),
            ("description", Shape::string()),
            ("resourceLink", Shape::url().nullable()),
        ]);
        let section = Shape::object([
            ("sectionTitle", Shape::string()),
            ("steps", Shape::array(step)),
        ]);
        Shape::object([("roadmap", Shape::array(section).at_least(3))])
    }
}

/// Stored form of a roadmap, under `users/{uid}/roadmaps/{careerTitle}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRoadmap {
    #[serde(flatten)]
    pub roadmap: Roadmap,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
