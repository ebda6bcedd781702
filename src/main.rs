use clap::Parser;
use stack_warden::utils::{logger, validation::Validate};
use stack_warden::{build_orchestrator, CliConfig, DeploymentConfig, RunOptions};

#[tokio::main]
async fn main() {
    let args = CliConfig::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting stack-warden");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match DeploymentConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.severity().exit_code().max(1));
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_plan_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be started");
        return;
    }

    let options = RunOptions {
        monitor: args.monitor.unwrap_or_else(|| config.monitoring_enabled()),
        skip_inspection: args.skip_inspection,
    };

    let orchestrator = match build_orchestrator(&config, options) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!("❌ {}", e.user_friendly_message());
            std::process::exit(e.severity().exit_code().max(1));
        }
    };

    let outcome = orchestrator.run().await;
    let trace: Vec<String> = outcome.trace.iter().map(ToString::to_string).collect();
    tracing::info!("🧭 Trace: {}", trace.join(" -> "));

    if outcome.succeeded() {
        for result in &outcome.health_results {
            println!("💚 {} ready after {} attempt(s)", result.service, result.attempts);
        }
        if let Some(path) = &outcome.report_path {
            println!("📁 Inspection report saved to: {}", path);
        }
        println!("✅ Deployment '{}' is healthy", config.deployment.name);
    } else if let Some(e) = &outcome.error {
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
    }

    std::process::exit(outcome.exit_code());
}

fn display_plan_summary(config: &DeploymentConfig, args: &CliConfig) {
    let plan = config.deployment_plan();
    let policy = config.retry_policy();

    println!("📋 Deployment Plan:");
    println!("  Name: {}", plan.name);
    println!("  Compose file: {}", config.compose_file().display());
    println!("  Runtime: {}", config.runtime());
    println!("  Required tools: {}", config.required_tools().join(", "));

    let ports: Vec<String> = plan.required_ports().iter().map(u16::to_string).collect();
    println!("  Ports: {}", if ports.is_empty() { "none".to_string() } else { ports.join(", ") });

    println!(
        "  Readiness: {} attempts every {:?} (budget {:?} per service, request timeout {:?})",
        policy.max_attempts,
        policy.interval,
        policy.budget(),
        config.request_timeout()
    );

    println!("  Services (verification order):");
    for (index, service) in plan.services.iter().enumerate() {
        let port = service
            .required_port
            .map(|p| format!(" [port {}]", p))
            .unwrap_or_default();
        println!("    {}. {} -> {}{}", index + 1, service.name, service.health_url, port);
    }

    match &config.inspection {
        Some(inspection) if config.inspection_enabled() && !args.skip_inspection => println!(
            "  Inspection: {} -> {}/{}",
            inspection.image,
            config.report_dir(),
            config.report_file()
        ),
        _ => println!("  Inspection: disabled"),
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
