use chrono::Utc;
use clap::Parser;
use news_pages::config::cli::{Command, LogFormat, ScheduleArgs};
use news_pages::utils::{logger, validation::Validate};
use news_pages::{
    Cli, EtlEngine, LocalStorage, NewsPipeline, PagesError, Scheduler, TriggerKind,
    WorkflowConfig, WorkflowRunner,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.log_format {
        LogFormat::Text => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting news-pages {}", env!("CARGO_PKG_VERSION"));

    let mut config = match WorkflowConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    if let Command::Build(args) = &cli.command {
        args.apply(&mut config);
    }
    if cli.verbose {
        tracing::debug!("Workflow config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        exit_with(&e);
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = match cli.command {
        Command::Build(_) => build(config, cli.monitor).await,
        Command::Run => run(config, cli.monitor).await,
        Command::Schedule(args) => schedule(config, cli.monitor, args).await,
        Command::Validate => validate(&config),
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ news-pages failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        exit_with(&e);
    }

    Ok(())
}

/// Prints the error for humans and exits with the code for its severity.
fn exit_with(e: &PagesError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.severity().exit_code())
}

async fn build(config: WorkflowConfig, monitor: bool) -> news_pages::Result<()> {
    let storage = LocalStorage::new(config.site.output_path.clone());
    let pipeline = NewsPipeline::new(storage, config)?;
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor);

    let index = engine.run().await?;
    tracing::info!("✅ Site built successfully");
    println!("✅ Site built successfully");
    println!("📁 Output saved to: {}", index);
    Ok(())
}

async fn run(config: WorkflowConfig, monitor: bool) -> news_pages::Result<()> {
    let runner = WorkflowRunner::new(config)?.with_monitoring(monitor);
    let report = runner.dispatch(TriggerKind::Manual).await?;

    println!(
        "✅ Workflow finished: {} steps in {:.1?}",
        report.steps.len(),
        report.duration()
    );
    Ok(())
}

async fn schedule(config: WorkflowConfig, monitor: bool, args: ScheduleArgs) -> news_pages::Result<()> {
    let cron = config
        .schedule()?
        .ok_or_else(|| PagesError::MissingConfigError {
            field: "trigger.schedule".to_string(),
        })?;

    let runner = WorkflowRunner::new(config)?.with_monitoring(monitor);
    let scheduler = Scheduler::new(runner, cron)
        .run_on_start(args.run_on_start)
        .max_runs(args.max_runs);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let runs = scheduler.run_until(shutdown).await?;
    println!("⏹️  Scheduler stopped after {} runs", runs);
    Ok(())
}

fn validate(config: &WorkflowConfig) -> news_pages::Result<()> {
    let steps = config.resolved_steps()?;

    println!("✅ Configuration is valid");
    println!("Workflow: {}", config.workflow.name);
    println!(
        "Source:   {} (q={}, pageSize={})",
        config.source.endpoint, config.source.query, config.source.page_size
    );
    println!("Site:     ./{}", config.site.output_path);
    println!("Branch:   {}", config.publish.branch);
    println!("Steps:");
    for (index, step) in steps.iter().enumerate() {
        println!("  {}. {} ({})", index + 1, step.name, step.label());
    }

    match config.schedule()? {
        Some(cron) => {
            println!("Schedule: {} (UTC)", cron);
            for at in cron.upcoming(Utc::now(), 3) {
                println!("  next: {}", at.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        None => println!("Schedule: disabled"),
    }
    println!(
        "Manual dispatch: {}",
        if config.trigger.manual { "enabled" } else { "disabled" }
    );
    Ok(())
}
