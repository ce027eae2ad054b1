//! `ctxforge assemble`: Assemble and optimize context for one request.

use super::load_service;
use ctxforge_core::task::TaskRequest;
use ctxforge_pipeline::OptimizationResult;
use tracing::debug;

pub struct AssembleArgs {
    pub input: String,
    pub task: String,
    pub priority: String,
    pub session: String,
    pub user: Option<String>,
    pub json: bool,
}

pub async fn run(args: AssembleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = TaskRequest::parse(&args.task, &args.input, &args.priority, &args.session)?;
    if let Some(user) = args.user {
        request = request.with_user(user);
    }

    debug!(task_type = %request.task_type, session_id = %request.session_id, "Parsed request");

    let service = load_service()?;
    let result = service.handle(request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &OptimizationResult) {
    let package = &result.package;
    let assessment = &result.assessment;

    println!("📦 Context package {} ({})", package.id, package.task_type);
    println!(
        "   Quality: overall {} (completeness {}, feasibility {}, clarity {}), confidence {:?}",
        assessment.overall(),
        assessment.completeness(),
        assessment.feasibility(),
        assessment.clarity(),
        assessment.confidence
    );
    println!(
        "   {} after {} pass(es)",
        if assessment.can_proceed { "✅ Ready to proceed" } else { "⚠️  Not ready" },
        result.passes
    );
    if package.degraded {
        println!("   Degraded: every context source was unavailable");
    }
    println!();
    println!("   Instructions: {}", package.system_instructions.len());
    println!("   Knowledge:    {}", package.relevant_knowledge.len());
    println!("   Patterns:     {}", package.related_patterns.len());
    println!("   Tools:        {}", package.available_tools.len());
    println!("   Memory:       {} recent interactions", package.short_term_memory.len());

    for item in &package.relevant_knowledge {
        println!("     • [{:.2}] {} ({})", item.relevance, item.title, item.source);
    }
    print_list("Missing", &assessment.missing_information);
    print_list("Issues", &assessment.potential_issues);
    print_list("Suggestions", &assessment.optimization_suggestions);
    print_list("Warnings", &package.warnings);
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("   {label}:");
    for item in items {
        println!("     - {item}");
    }
}
