//! Ask command - index local files and answer one question

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::domain::correction::RunResult;
use crate::infrastructure::ingestion::UploadedFile;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Document to index (PDF or plain text); repeat for several
    #[arg(long = "pdf", value_name = "PATH", required = true)]
    pub pdf: Vec<PathBuf>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,

    /// Question to answer
    pub question: String,
}

pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let service = crate::create_rag_service(&config)?;

    let mut files = Vec::with_capacity(args.pdf.len());
    for path in &args.pdf {
        files.push(read_file(path).await?);
    }

    let ingested = service.ingest(files).await?;
    tracing::info!(chunks = ingested.chunks_indexed, "Documents indexed");

    let result = service.ask(&args.question).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render(&result));
    }

    Ok(())
}

async fn read_file(path: &Path) -> anyhow::Result<UploadedFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(UploadedFile::new(name, bytes))
}

/// Human-readable answer followed by the loop trace
fn render(result: &RunResult) -> String {
    let mut out = format!("{}\n\n", result.answer);

    if result.final_query != result.original_question {
        out.push_str(&format!("Final question: {}\n", result.final_query));
    }
    out.push_str(&format!(
        "Termination: {} ({} retrieval, {} generation attempts)\n",
        result.termination.describe(),
        result.retrieval_attempts,
        result.generation_attempts
    ));
    if !result.sources.is_empty() {
        out.push_str(&format!("Sources: {}\n", result.sources.join(", ")));
    }

    out.push_str("Trace:\n");
    for entry in &result.trace {
        out.push_str(&format!(
            "  {} {:<22} {}\n",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.step.as_str(),
            entry.status
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::correction::{AnswerConfidence, LoopStep, Termination, TraceEntry};

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = read_file(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("/definitely/not/here.pdf"));
    }

    #[test]
    fn test_render_includes_answer_and_trace() {
        let result = RunResult {
            run_id: uuid::Uuid::new_v4(),
            answer: "Paris.".to_string(),
            original_question: "Capital of France?".to_string(),
            final_query: "Which city is the capital of France?".to_string(),
            termination: Termination::Accepted,
            confidence: AnswerConfidence::High,
            verdict: None,
            retrieval_attempts: 2,
            generation_attempts: 1,
            rewrite_reasons: Vec::new(),
            sources: vec!["france.pdf".to_string()],
            trace: vec![TraceEntry {
                step: LoopStep::Done,
                timestamp: chrono::Utc::now(),
                status: "Answer accepted".to_string(),
            }],
            duration_ms: 3,
        };

        let text = render(&result);

        assert!(text.starts_with("Paris.\n"));
        assert!(text.contains("Final question: Which city is the capital of France?"));
        assert!(text.contains("Sources: france.pdf"));
        assert!(text.contains("DONE"));
    }
}
