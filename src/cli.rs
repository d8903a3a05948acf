// src/cli.rs
use crate::client::{
    ApiClient, AuthStore, FirebaseSession, GuardDecision, InterviewSession, Navigator, RouteGuard,
};
use crate::environment::{self, EnvironmentConfig};
use crate::types::{AnalysisResult, CareerPathsResponse, Roadmap};
use crate::web::start_web_server;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "careertwin")]
#[command(about = "AI career coach: resume analysis, career paths, roadmaps and mock interviews")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Write JSON logs to this file instead of the terminal
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct Credentials {
    #[arg(long, env = "CAREERTWIN_EMAIL")]
    pub email: String,
    #[arg(long, env = "CAREERTWIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve,
    /// Analyze a PDF resume against a job description
    Analyze {
        resume: PathBuf,
        job_description: PathBuf,
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Recommend career paths from strengths and gaps
    CareerPaths {
        #[arg(long = "strength", required = true)]
        strengths: Vec<String>,
        #[arg(long = "gap", required = true)]
        gaps: Vec<String>,
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Generate and save a learning roadmap for a career
    Roadmap {
        career_title: String,
        #[arg(long = "strength")]
        strengths: Vec<String>,
        #[arg(long = "gap")]
        gaps: Vec<String>,
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Run a mock interview in the terminal, then print the feedback
    Interview {
        role: String,
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Create an account and its profile
    Register {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        credentials: Credentials,
    },
}

struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: &str) {
        eprintln!("Not signed in. Please log in ({}).", route);
    }
}

struct ClientContext {
    api: ApiClient,
    store: AuthStore,
}

fn connect() -> Result<ClientContext> {
    let session = Arc::new(FirebaseSession::new(environment::firebase_api_key()?)?);
    let api = ApiClient::new(&environment::api_url(), session.clone())?;
    let store = AuthStore::new(session).with_profiles(api.clone());
    store.initialize();
    Ok(ClientContext { api, store })
}

/// Sign in and pass the route guard before talking to the API.
async fn signed_in(credentials: &Credentials) -> Result<ApiClient> {
    let context = connect()?;
    if !context
        .store
        .login(&credentials.email, &credentials.password)
        .await
    {
        let error = context.store.snapshot().error.unwrap_or_default();
        anyhow::bail!("Login failed: {}", error);
    }

    let mut guard = RouteGuard::new(TerminalNavigator);
    match guard.settle(context.store.subscribe()).await {
        GuardDecision::Render => Ok(context.api),
        _ => anyhow::bail!("Not signed in"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to format response")?
    );
    Ok(())
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve => {
            let config = EnvironmentConfig::load()?;
            let port = environment::server_port()?;
            start_web_server(config, port).await
        }

        Command::Analyze {
            resume,
            job_description,
            credentials,
        } => {
            let api = signed_in(&credentials).await?;
            let bytes = tokio::fs::read(&resume)
                .await
                .with_context(|| format!("Failed to read {}", resume.display()))?;
            let job_text = tokio::fs::read_to_string(&job_description)
                .await
                .with_context(|| format!("Failed to read {}", job_description.display()))?;
            let file_name = resume
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "resume.pdf".to_string());
            crate::utils::validate_file_extension(&file_name, &["pdf"])?;

            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("application/pdf")?;
            let form = Form::new()
                .part("resumeFile", part)
                .text("jobDescriptionText", job_text);

            info!("Uploading {} for analysis", resume.display());
            let result: AnalysisResult = api.post_form("/api/analyze-resume", form).await?;
            print_json(&result)
        }

        Command::CareerPaths {
            strengths,
            gaps,
            credentials,
        } => {
            let api = signed_in(&credentials).await?;
            let response: CareerPathsResponse = api
                .post_json(
                    "/api/career-paths",
                    &json!({ "strengths": strengths, "gaps": gaps }),
                )
                .await?;
            print_json(&response)
        }

        Command::Roadmap {
            career_title,
            strengths,
            gaps,
            credentials,
        } => {
            let api = signed_in(&credentials).await?;
            let roadmap: Roadmap = api
                .post_json(
                    "/api/roadmap",
                    &json!({
                        "careerTitle": career_title,
                        "strengths": strengths,
                        "gaps": gaps,
                    }),
                )
                .await?;
            print_json(&roadmap)
        }

        Command::Interview { role, credentials } => {
            let api = signed_in(&credentials).await?;
            run_interview(InterviewSession::new(api, role)).await
        }

        Command::Register { name, credentials } => {
            let context = connect()?;
            if context
                .store
                .register(&name, &credentials.email, &credentials.password)
                .await
            {
                println!("Account created for {}", credentials.email);
                Ok(())
            } else {
                let error = context.store.snapshot().error.unwrap_or_default();
                anyhow::bail!("{}", error)
            }
        }
    }
}

async fn run_interview(mut session: InterviewSession) -> Result<()> {
    println!(
        "Mock interview for \"{}\". Type your answers; an empty line ends the interview.",
        session.interview_context()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut message = "Hello, I'm ready to begin.".to_string();

    loop {
        print!("\nInterviewer: ");
        session
            .send(&message, |fragment| {
                print!("{}", fragment);
                let _ = std::io::stdout().flush();
            })
            .await?;
        print!("\n\nYou: ");
        std::io::stdout().flush()?;

        match lines.next_line().await? {
            Some(line) if !line.trim().is_empty() => {
                let analysis = session.analyze_answer(&line).await?;
                info!(
                    "Answer sentiment {:.2}, keywords {:?}",
                    analysis.sentiment.score, analysis.keywords
                );
                message = line;
            }
            _ => break,
        }
    }

    println!("\nGenerating feedback...");
    let report = session.feedback().await?;
    print_json(&report)
}
