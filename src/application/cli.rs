use std::io;
use std::path;
use std::process;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AspectRatio;
use crate::domain::models::GeneratedImage;
use crate::domain::models::ImageBlob;
use crate::domain::models::ImageFile;
use crate::domain::models::Mode;
use crate::domain::services::clipboard::ClipboardService;
use crate::domain::services::codec;
use crate::domain::services::AppState;
use crate::domain::services::Exports;
use crate::domain::services::History;
use crate::infrastructure::backends::BackendManager;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    process::exit(0);
}

fn format_entry(image: &GeneratedImage) -> String {
    let mut res = format!("- (ID: {})", image.id);

    let timestamp = image
        .id
        .parse::<i64>()
        .ok()
        .and_then(|millis| return chrono::DateTime::from_timestamp(millis / 1000, 0));
    if let Some(timestamp) = timestamp {
        let local = timestamp.with_timezone(&chrono::Local);
        res = format!("{res} {}", local.format("%Y-%m-%d %H:%M"));
    }

    let mut line = image.prompt.split('\n').next().unwrap_or("").to_string();
    if line.chars().count() >= 70 {
        line = format!("{}...", line.chars().take(67).collect::<String>());
    }
    if !line.is_empty() {
        res = format!("{res}, {line}");
    }

    return res;
}

async fn print_history_list() -> Result<()> {
    let store = History::default();
    let entries = store
        .load()
        .await
        .iter()
        .map(format_entry)
        .collect::<Vec<String>>();

    if entries.is_empty() {
        println!("There is no history yet. Generate your first image!");
    } else {
        println!("{}", entries.join("\n"));
    }

    return Ok(());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if !config_file_path.parent().unwrap().exists() {
        fs::create_dir_all(config_file_path.parent().unwrap()).await?;
    }

    fs::write(&config_file_path, Config::serialize_default(build())).await?;

    let config_path_display = config_file_path.as_os_str().to_str().unwrap();
    println!("Created default config file at {config_path_display}");
    return Ok(());
}

async fn read_image(file_path: &str) -> Result<ImageFile> {
    let bytes = fs::read(file_path).await?;
    let mime_type = codec::sniff_mime(&bytes);
    if mime_type == "application/octet-stream" {
        bail!(format!("{file_path} does not look like an image file"));
    }

    let blob = ImageBlob::new(bytes, mime_type);
    return Ok(ImageFile {
        preview_url: codec::data_url(&blob),
        blob,
    });
}

async fn finish(state: &AppState, share: bool) -> Result<()> {
    if let Some(err) = &state.error {
        eprintln!("{}", Paint::red(err));
        process::exit(1);
    }

    if let Some(image) = &state.generated_image {
        let exports = Exports::default();
        let target = exports.write(image).await?;
        println!("{}", Paint::green(format!("Saved {}", target.display())));

        if share {
            ClipboardService::share(&format!("{} ({})", image.prompt, target.display()));
        }
    }

    return Ok(());
}

async fn run_generate(mode: Mode, matches: &ArgMatches) -> Result<()> {
    let store = History::default();
    let backend = BackendManager::get();

    let mut state = AppState::default();
    state.load_history(&store).await;
    state.set_mode(mode);

    if let Some(prompt) = matches.get_one::<String>("prompt") {
        state.set_prompt(prompt);
    }
    if let Some(function) = matches.get_one::<String>("function") {
        if mode == Mode::Create {
            state.set_active_create_fn(function);
        } else {
            state.set_active_edit_fn(function);
        }
    }
    if let Some(ratio) = AspectRatio::parse(Config::get(ConfigKey::AspectRatio)) {
        state.set_aspect_ratio(ratio);
    }

    let image_paths = matches
        .get_many::<String>("image")
        .map(|paths| {
            return paths.cloned().collect::<Vec<String>>();
        })
        .unwrap_or_default();
    if image_paths.len() > 2 {
        bail!("A maximum of two reference images is supported");
    }

    let mut images = vec![];
    for file_path in &image_paths {
        images.push(read_image(file_path).await?);
    }
    let mut images = images.into_iter();
    state.set_image1(images.next());
    state.set_image2(images.next());

    state.submit(backend.as_ref(), &store).await;

    return finish(&state, matches.get_flag("share")).await;
}

async fn run_restyle(matches: &ArgMatches) -> Result<()> {
    let store = History::default();
    let backend = BackendManager::get();

    let mut state = AppState::default();
    state.load_history(&store).await;

    let Some(latest) = state.history.first() else {
        bail!("History is empty. Generate an image first.");
    };
    let id = latest.id.clone();
    state.select_history_item(&id);

    let style = matches.get_one::<String>("style").unwrap();
    state.apply_style(backend.as_ref(), &store, style).await;

    return finish(&state, matches.get_flag("share")).await;
}

async fn run_doctor() -> Result<()> {
    let backend = BackendManager::get();
    match backend.health_check().await {
        Ok(()) => println!("{}", Paint::green("Image service: reachable")),
        Err(err) => println!("{}", Paint::red(format!("Image service: {err}"))),
    }

    match ClipboardService::healthcheck() {
        Ok(()) => println!("{}", Paint::green("Clipboard: available")),
        Err(_) => println!(
            "{}",
            Paint::yellow("Clipboard: unavailable, sharing is disabled")
        ),
    }

    let store = History::default();
    println!("History file: {}", store.cache_file.display());

    return Ok(());
}

fn arg_prompt() -> Arg {
    return Arg::new("prompt")
        .help("The prompt describing what to generate. Leave empty to use the selected function's default prompt.")
        .required(false);
}

fn arg_image() -> Arg {
    return Arg::new("image")
        .short('i')
        .long("image")
        .help("Path to a reference image. May be passed twice to combine two images.")
        .action(ArgAction::Append)
        .num_args(1);
}

fn arg_share() -> Arg {
    return Arg::new("share")
        .long("share")
        .help("Copy the result's prompt and file path to the clipboard when one is available.")
        .action(ArgAction::SetTrue);
}

fn subcommand_generate() -> Command {
    return Command::new("generate")
        .about("Create a new image from a prompt, optionally conditioned on reference images.")
        .arg(arg_prompt())
        .arg(
            Arg::new("function")
                .short('f')
                .long("function")
                .help("Creation function shaping the prompt. [known values: free, sticker, text, comic, 3d-mascot, thumbnail]")
                .num_args(1),
        )
        .arg(arg_image())
        .arg(arg_share());
}

fn subcommand_edit() -> Command {
    return Command::new("edit")
        .about("Transform an existing image.")
        .arg(arg_prompt())
        .arg(
            Arg::new("function")
                .short('f')
                .long("function")
                .help("Edit function shaping the prompt. [known values: add-remove, retouch, style, compose]")
                .num_args(1),
        )
        .arg(arg_image())
        .arg(arg_share());
}

fn subcommand_restyle() -> Command {
    return Command::new("restyle")
        .about("Re-generate the most recent result with a one-tap style.")
        .arg(
            Arg::new("style")
                .help("Style to apply.")
                .value_parser(PossibleValuesParser::new([
                    "perfection",
                    "advertising",
                    "cinema",
                ]))
                .required(true),
        )
        .arg(arg_share());
}

fn subcommand_history_delete() -> Command {
    return Command::new("delete")
        .about("Delete one or all history entries.")
        .arg(
            Arg::new("id")
                .short('i')
                .long("id")
                .help("History entry ID")
                .num_args(1),
        )
        .arg(
            Arg::new("all")
                .long("all")
                .help("Delete all history entries.")
                .action(ArgAction::SetTrue),
        )
        .group(ArgGroup::new("delete-args").args(["id", "all"]).required(true));
}

fn subcommand_history() -> Command {
    return Command::new("history")
        .about("Manage previously generated images.")
        .arg_required_else_help(true)
        .subcommand(Command::new("dir").about("Print the history file path."))
        .subcommand(
            Command::new("list").about("List all kept results, most recent first."),
        )
        .subcommand(
            Command::new("open")
                .about("Export a past result to the export directory by ID.")
                .arg(
                    Arg::new("id")
                        .short('i')
                        .long("id")
                        .help("History entry ID")
                        .required(true),
                ),
        )
        .subcommand(subcommand_history_delete());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for Atelier")
        .hide(true)
        .subcommand(Command::new("log-path").about(
            "Output path to debug log file generated when running Atelier with environment variable RUST_LOG=atelier",
        ))
        .subcommand(Command::new("enum-config").about("List all config keys as strings."));
}

fn config_arg(key: ConfigKey, env_name: &'static str, help: String) -> Arg {
    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env_name)
        .num_args(1)
        .help(help)
        .global(true);
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("atelier")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(subcommand_generate())
        .subcommand(subcommand_edit())
        .subcommand(subcommand_restyle())
        .subcommand(subcommand_history())
        .subcommand(Command::new("doctor").about("Check connectivity and local integrations."))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("ATELIER_CONFIG_FILE")
                .num_args(1)
                .help(format!(
                    "Path to configuration file [default: {}]",
                    Config::default(ConfigKey::ConfigFile)
                ))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::AspectRatio.to_string())
                .short('a')
                .long(ConfigKey::AspectRatio.to_string())
                .env("ATELIER_ASPECT_RATIO")
                .num_args(1)
                .help(format!(
                    "Aspect ratio requested from the image models. [default: {}]",
                    Config::default(ConfigKey::AspectRatio)
                ))
                .value_parser(PossibleValuesParser::new(AspectRatio::VARIANTS))
                .global(true),
        )
        .arg(config_arg(
            ConfigKey::BackendHealthCheckTimeout,
            "ATELIER_BACKEND_HEALTH_CHECK_TIMEOUT",
            format!(
                "Time to wait in milliseconds before timing out when doing a healthcheck. [default: {}]",
                Config::default(ConfigKey::BackendHealthCheckTimeout)
            ),
        ))
        .arg(config_arg(
            ConfigKey::ExportDir,
            "ATELIER_EXPORT_DIR",
            format!(
                "Directory generated images are exported to. [default: {}]",
                Config::default(ConfigKey::ExportDir)
            ),
        ))
        .arg(config_arg(
            ConfigKey::ExportPrefix,
            "ATELIER_EXPORT_PREFIX",
            format!(
                "File name prefix for exported images. [default: {}]",
                Config::default(ConfigKey::ExportPrefix)
            ),
        ))
        .arg(config_arg(
            ConfigKey::GeminiToken,
            "ATELIER_GEMINI_TOKEN",
            "Google AI Studio API key used for all generation calls.".to_string(),
        ))
        .arg(config_arg(
            ConfigKey::GeminiURL,
            "ATELIER_GEMINI_URL",
            format!(
                "Generative Language API URL. Can be swapped to a compatible proxy. [default: {}]",
                Config::default(ConfigKey::GeminiURL)
            ),
        ))
        .arg(config_arg(
            ConfigKey::HistoryLimit,
            "ATELIER_HISTORY_LIMIT",
            format!(
                "How many past results are kept in history. [default: {}]",
                Config::default(ConfigKey::HistoryLimit)
            ),
        ))
        .arg(config_arg(
            ConfigKey::HistoryQuotaBytes,
            "ATELIER_HISTORY_QUOTA_BYTES",
            format!(
                "Byte budget for the persisted history document. Oldest entries are evicted when a save does not fit. [default: {}]",
                Config::default(ConfigKey::HistoryQuotaBytes)
            ),
        ))
        .arg(config_arg(
            ConfigKey::ImageModel,
            "ATELIER_IMAGE_MODEL",
            format!(
                "Model used for image-conditioned generation and edits. [default: {}]",
                Config::default(ConfigKey::ImageModel)
            ),
        ))
        .arg(config_arg(
            ConfigKey::ImagenModel,
            "ATELIER_IMAGEN_MODEL",
            format!(
                "Model used for text-only generation. [default: {}]",
                Config::default(ConfigKey::ImagenModel)
            ),
        ));
}

pub async fn parse() -> Result<()> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("generate", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            run_generate(Mode::Create, subcmd_matches).await?;
        }
        Some(("edit", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            run_generate(Mode::Edit, subcmd_matches).await?;
        }
        Some(("restyle", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            run_restyle(subcmd_matches).await?;
        }
        Some(("doctor", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            run_doctor().await?;
        }
        Some(("history", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            match subcmd_matches.subcommand() {
                Some(("dir", _)) => {
                    let store = History::default();
                    println!("{}", store.cache_file.display());
                }
                Some(("list", _)) => {
                    print_history_list().await?;
                }
                Some(("open", open_matches)) => {
                    let store = History::default();
                    let mut state = AppState::default();
                    state.load_history(&store).await;

                    let id = open_matches.get_one::<String>("id").unwrap();
                    if !state.select_history_item(id) {
                        bail!(format!("No history entry found for id {id}"));
                    }
                    finish(&state, false).await?;
                }
                Some(("delete", delete_matches)) => {
                    let store = History::default();
                    if let Some(id) = delete_matches.get_one::<String>("id") {
                        let mut state = AppState::default();
                        state.load_history(&store).await;
                        state.delete_history_item(&store, id).await;
                        println!("Deleted {id}");
                    } else if delete_matches.get_flag("all") {
                        store.clear().await;
                        println!("Deleted all history entries");
                    } else {
                        subcommand_history_delete().print_long_help()?;
                    }
                }
                _ => {
                    subcommand_history().print_long_help()?;
                }
            }
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
            }
            _ => {
                subcommand_config().print_long_help()?;
            }
        },
        Some(("debug", debug_matches)) => match debug_matches.subcommand() {
            Some(("log-path", _)) => {
                let log_path = dirs::cache_dir().unwrap().join("atelier/debug.log");
                println!("{}", log_path.to_str().unwrap());
            }
            Some(("enum-config", _)) => {
                let res = ConfigKey::VARIANTS.join("\n");
                println!("{}", res);
            }
            _ => {
                subcommand_debug().print_long_help()?;
            }
        },
        _ => {
            build().print_long_help()?;
        }
    }

    return Ok(());
}
