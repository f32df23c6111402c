use anyhow::Context;
use chrono::Local;
use clap::{CommandFactory, Parser};
use fare_watch::adapters::http::build_client;
use fare_watch::adapters::{
    AmadeusClient, HttpEmailClient, SheetClient, SmtpEmailClient, TwilioSms,
};
use fare_watch::config::{self, EmailSettings};
use fare_watch::core::notifier::Notifier;
use fare_watch::domain::ports::EmailChannel;
use fare_watch::utils::error::ErrorSeverity;
use fare_watch::utils::logger;
use fare_watch::{
    CliArgs, DealPipeline, FareWatchEngine, FareWatchError, ModeReport, RunMode, SearchPlan,
    Settings,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 先載入 .env，讓其中的 RUST_LOG 生效
    let dotenv_loaded = config::load_dotenv(args.env_file.as_deref());

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let modes = args.modes();
    if modes.is_empty() {
        CliArgs::command().print_help()?;
        println!();
        return Ok(());
    }

    tracing::info!("Starting fare-watch");
    if dotenv_loaded {
        tracing::debug!("Loaded variables from .env file");
    }
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 載入並驗證設定
    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => fail(e),
    };

    let engine = match build_engine(&args, &settings, &modes) {
        Ok(engine) => engine,
        Err(e) => fail(e),
    };

    match engine.run_all(&modes).await {
        Ok(reports) => {
            for (mode, report) in reports {
                print_report(mode, &report)?;
            }
            tracing::info!("✅ fare-watch finished");
        }
        Err(e) => fail(e),
    }

    Ok(())
}

fn load_settings(args: &CliArgs) -> fare_watch::Result<Settings> {
    let dotenv = args.env_file.as_deref();
    match &args.config {
        Some(path) => {
            tracing::info!("📄 Loading settings from {}", path.display());
            Settings::from_file_and_env(path, dotenv)
        }
        None => Settings::from_env(dotenv),
    }
}

fn build_engine(
    args: &CliArgs,
    settings: &Settings,
    modes: &[RunMode],
) -> fare_watch::Result<FareWatchEngine> {
    let client = build_client(settings.request_timeout)?;
    let sheet = SheetClient::from_settings(client.clone(), settings);
    let email_enabled = sheet.has_users_endpoint();
    let sheet = Arc::new(sheet);

    let mut engine = FareWatchEngine::new(sheet.clone());
    let needs_provider = modes.iter().any(RunMode::needs_provider);
    if !needs_provider {
        return Ok(engine);
    }

    let provider = Arc::new(AmadeusClient::from_settings(
        client.clone(),
        settings.amadeus()?,
    ));
    let plan = SearchPlan::from_settings(settings, &args.overrides(), Local::now().date_naive())?;
    let mut pipeline = DealPipeline::new(sheet.clone(), provider, plan);

    if modes.contains(&RunMode::Search { notify: true }) {
        let sms = Arc::new(TwilioSms::new(client.clone(), settings.twilio()?));
        let mut notifier = Notifier::new(sms);
        match settings.email() {
            Some(email) if email_enabled => {
                let channel: Arc<dyn EmailChannel> = match email {
                    EmailSettings::Smtp(smtp) => Arc::new(SmtpEmailClient::new(smtp)?),
                    EmailSettings::Api(api) => Arc::new(HttpEmailClient::new(client, api)),
                };
                notifier = notifier.with_email(channel, sheet);
            }
            _ => tracing::info!(
                "📧 Email notifications disabled (EMAIL_SENDER/EMAIL_PASSWORD or SHEETY_USERS_ENDPOINT not set)"
            ),
        }
        pipeline = pipeline.with_notifier(notifier);
    }

    engine = engine.with_pipeline(pipeline);
    Ok(engine)
}

fn print_report(mode: RunMode, report: &ModeReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    match mode {
        RunMode::Fetch => println!("{}", json),
        RunMode::Push { .. } => println!("📤 Sheet returned:\n{}", json),
        RunMode::SyncIata | RunMode::Search { .. } => {
            if let ModeReport::Summary(summary) = report {
                for failure in &summary.errors {
                    tracing::warn!(
                        "⚠️ {} [{}]: {}",
                        failure.destination,
                        failure.kind,
                        failure.message
                    );
                }
            }
            println!("📊 Run summary:\n{}", json);
        }
    }
    Ok(())
}

fn fail(e: FareWatchError) -> ! {
    tracing::error!(
        "❌ fare-watch failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Critical => 3, // 認證或試算表錯誤
        _ => 1,
    };
    std::process::exit(exit_code);
}
