use clap::Parser;
use extractify_server::{
    logging, Cli, Config, ExtractifyError, ExtractifyServer, UserFriendlyError,
};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    if let Err(e) = logging::init(cli.log_format, cli.verbosity_level(), cli.quiet) {
        eprintln!("{}", e.user_message());
        return 1;
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    let server = match ExtractifyServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    server.shutdown_handle().listen_for_signals();

    match server.run().await {
        Ok(()) => 0,
        Err(e) => {
            print_startup_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &ExtractifyError) -> i32 {
    match error {
        ExtractifyError::Config { .. } => 2,
        ExtractifyError::Io(_) => 3,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "extractify.toml".to_string());

    match ExtractifyServer::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  extractify-server --config {}", config_path);
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(config: &Config) -> i32 {
    println!("Configuration is valid. The server would run with:");
    println!("  Bind address: {}", config.server.bind);
    println!("  Upload directory: {}", config.upload.directory.display());
    println!("  Max upload size: {} bytes", config.server.max_upload_bytes);
    println!("  Extractor: {}", config.extractor.binary.display());
    if !config.extractor.launcher_args.is_empty() {
        println!("  Launcher args: {}", config.extractor.launcher_args.join(" "));
    }
    println!("  Extractor timeout: {} seconds", config.extractor.timeout_secs);
    println!("  Report delimiter: {:?}", config.extractor.delimiter);
    match config.server.static_dir {
        Some(ref dir) => println!("  Static files: {}", dir.display()),
        None => println!("  Static files: disabled"),
    }

    0
}

fn print_startup_error(error: &ExtractifyError) {
    tracing::error!(error = %error, "Startup failed");
    eprintln!("Error: {}", error.user_message());
    if let Some(suggestion) = error.suggestion() {
        eprintln!("Suggestion: {}", suggestion);
    }
}
