//! Recipe Forge - AI-powered recipe extraction from social media captions
//!
//! Takes a social post URL plus its pre-extracted caption text, drives a
//! language model through the extraction pipeline and uploads the finished
//! recipe to Tandoor or Mealie.

use recipe_forge::{
    jobs::{process_job, JobStatus, JobTracker},
    ApiSession, BrowserSession, FileCaptionSource, ForgeConfig, MealieAdapter, ModelSession,
    Platform, RecipeBackend, RecipeForgeError, Result, SessionKind, TandoorAdapter, UploadClient,
    WebDriverSurface,
};
use std::env;
use std::path::PathBuf;
use std::process;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = recipe_forge::init() {
        eprintln!("❌ Failed to initialize: {}", e);
        process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        print_help();
        return Ok(());
    }

    let cli = match CliArgs::parse(&args[1..]) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 Use --help for usage information");
            process::exit(1);
        }
    };

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }

    Ok(())
}

struct CliArgs {
    url: String,
    platform: Platform,
    caption_file: PathBuf,
    thumbnail: Option<PathBuf>,
    backend: Option<RecipeBackend>,
}

impl CliArgs {
    fn parse(args: &[String]) -> Result<Self> {
        let mut url = None;
        let mut platform = Platform::Instagram;
        let mut caption_file = None;
        let mut thumbnail = None;
        let mut backend = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--platform" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| RecipeForgeError::validation("--platform needs a value"))?;
                    platform = value.parse()?;
                }
                "--caption-file" => {
                    let value = iter.next().ok_or_else(|| {
                        RecipeForgeError::validation("--caption-file needs a value")
                    })?;
                    caption_file = Some(PathBuf::from(value));
                }
                "--thumbnail" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| RecipeForgeError::validation("--thumbnail needs a value"))?;
                    thumbnail = Some(PathBuf::from(value));
                }
                "--target" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| RecipeForgeError::validation("--target needs a value"))?;
                    backend = Some(value.parse()?);
                }
                other if other.starts_with("--") => {
                    return Err(RecipeForgeError::validation(format!(
                        "Unknown option: {}",
                        other
                    )));
                }
                other => {
                    if url.is_some() {
                        return Err(RecipeForgeError::validation(format!(
                            "Unexpected argument: {}",
                            other
                        )));
                    }
                    url = Some(other.to_string());
                }
            }
        }

        Ok(Self {
            url: url.ok_or_else(|| RecipeForgeError::validation("Missing post URL"))?,
            platform,
            caption_file: caption_file.ok_or_else(|| {
                RecipeForgeError::validation("Missing --caption-file (pre-extracted caption text)")
            })?,
            thumbnail,
            backend,
        })
    }
}

async fn run(cli: CliArgs) -> Result<()> {
    println!("🍳 Recipe Forge - AI-powered recipe extraction");
    println!("═══════════════════════════════════════════════");
    println!();

    let mut config = ForgeConfig::from_env()?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    println!("🎯 Post: {} ({})", cli.url, cli.platform);
    println!("📦 Backend: {}", config.backend);
    println!("🤖 Session: {}", config.session);
    println!();

    let session = build_session(&config).await?;
    let uploader = UploadClient::new(config.tandoor.clone(), config.mealie.clone())?;
    let source = FileCaptionSource::new(cli.caption_file, cli.thumbnail);

    let tracker = JobTracker::new();
    let job_id = tracker.create(&cli.url, cli.platform, config.backend);

    println!("🤖 Extracting recipe with AI...");
    match config.backend {
        RecipeBackend::Tandoor => {
            process_job(
                &tracker,
                job_id,
                &source,
                session,
                TandoorAdapter::new(),
                &uploader,
                &config.language,
                &config.audit_path,
            )
            .await;
        }
        RecipeBackend::Mealie => {
            process_job(
                &tracker,
                job_id,
                &source,
                session,
                MealieAdapter::new(),
                &uploader,
                &config.language,
                &config.audit_path,
            )
            .await;
        }
    }

    let job = tracker
        .get(job_id)
        .ok_or_else(|| RecipeForgeError::validation("job vanished from tracker"))?;

    println!();
    match job.status {
        JobStatus::Completed => {
            println!("✅ {}", job.message);
            if let Some(recipe_id) = &job.recipe_id {
                println!("🍽️  Recipe ID: {}", recipe_id);
            }
            println!("📄 Final document: {}", config.audit_path.display());
            Ok(())
        }
        _ => {
            println!("❌ {}", job.message);
            process::exit(1);
        }
    }
}

async fn build_session(config: &ForgeConfig) -> Result<Box<dyn ModelSession>> {
    match config.session {
        SessionKind::Api => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                RecipeForgeError::config(
                    "No API key configured. Please set the OPENAI_API_KEY environment variable.",
                )
            })?;
            let session = ApiSession::new(
                api_key,
                config.api_model.clone(),
                config.api_base_url.clone(),
            )?;
            println!("✅ API session configured ({})", config.api_model);
            Ok(Box::new(session))
        }
        SessionKind::Browser => {
            let surface = WebDriverSurface::connect(&config.webdriver_url).await?;
            println!("✅ Browser session attached ({})", config.webdriver_url);
            Ok(Box::new(BrowserSession::new(surface)))
        }
    }
}

/// Print help information
fn print_help() {
    println!("🍳 Recipe Forge - AI-powered recipe extraction");
    println!("═══════════════════════════════════════════════");
    println!();
    println!("USAGE:");
    println!("    recipe-forge <URL> --caption-file <PATH> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --platform <instagram|tiktok>   Source platform (default: instagram)");
    println!("    --caption-file <PATH>           Pre-extracted caption text file");
    println!("    --thumbnail <PATH>              Extracted still image to upload");
    println!("    --target <tandoor|mealie>       Override the configured backend");
    println!();
    println!("EXAMPLES:");
    println!("    recipe-forge https://www.instagram.com/p/abc/ --caption-file caption.txt");
    println!("    recipe-forge https://www.tiktok.com/@chef/video/1 \\");
    println!("        --platform tiktok --caption-file caption.txt --target mealie");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    MODEL_SESSION      api | browser (default: api)");
    println!("    RECIPE_BACKEND     tandoor | mealie (default: tandoor)");
    println!("    LANGUAGE_CODE      Output language for the model (default: en)");
    println!();
    println!("    OPENAI_API_KEY     API key for the api session");
    println!("    OPENAI_MODEL       Model name (default: gpt-4.1-mini)");
    println!("    OPENAI_BASE_URL    OpenAI-compatible endpoint override");
    println!("    WEBDRIVER_URL      WebDriver endpoint for the browser session");
    println!();
    println!("    BASE_URL_TANDOOR / TOKEN_TANDOOR   Tandoor API access");
    println!("    BASE_URL_MEALIE  / TOKEN_MEALIE    Mealie API access");
    println!("    FINAL_JSON_PATH    Audit file path (default: final_json.json)");
}
