use std::io;
use std::io::IsTerminal;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use super::logging;
use super::render::render_segments;
use super::render::render_warning;
use super::server;
use super::server::AppState;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ActionRequest;
use crate::domain::models::AppError;
use crate::domain::models::CodeAction;
use crate::domain::models::GatewayBox;
use crate::domain::models::Message;
use crate::domain::models::Snippet;
use crate::domain::models::SnippetDraft;
use crate::domain::models::StatField;
use crate::domain::models::UsageRecorder;
use crate::domain::models::UsageStats;
use crate::domain::services::clipboard::ClipboardService;
use crate::domain::services::record_usage;
use crate::domain::services::ActionDispatcher;
use crate::domain::services::CodeBlocks;
use crate::domain::services::Snippets;
use crate::domain::services::Stats;
use crate::domain::services::UsageKind;
use crate::infrastructure::backends::GatewayManager;
use crate::infrastructure::backends::GatewayTarget;
use crate::infrastructure::proxy_client::ProxyClient;
use crate::infrastructure::stores::StoreBox;
use crate::infrastructure::stores::StoreManager;

const SERVE_LOG_FILTER: &str = "codeaction=info,tower_http=info";
const CLIENT_LOG_FILTER: &str = "codeaction=warn";

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

fn open_store() -> Result<StoreBox> {
    let data_dir = Config::get(ConfigKey::DataDir);
    return Ok(StoreManager::open(path::Path::new(&data_dir))?);
}

/// Where client commands send their work: a running host, or with `--local`
/// straight to the provider and the on-disk store.
enum Target {
    Host(ProxyClient),
    Local { snippets: Snippets, stats: Stats },
}

impl Target {
    fn from_matches(matches: &ArgMatches) -> Result<Target> {
        if matches.get_flag("local") {
            let store = open_store()?;
            return Ok(Target::Local {
                snippets: Snippets::new(store.clone()),
                stats: Stats::new(store),
            });
        }

        return Ok(Target::Host(ProxyClient::default()));
    }

    fn gateway(&self) -> Result<GatewayBox> {
        match self {
            Target::Host(_) => return GatewayManager::get(GatewayTarget::Proxy),
            Target::Local { .. } => return GatewayManager::get(GatewayTarget::Provider),
        }
    }

    fn recorder(&self) -> &(dyn UsageRecorder + Send + Sync) {
        match self {
            Target::Host(client) => return client,
            Target::Local { stats, .. } => return stats,
        }
    }

    async fn snippets(&self) -> Result<Vec<Snippet>, AppError> {
        match self {
            Target::Host(client) => return client.snippets().await,
            Target::Local { snippets, .. } => return snippets.list(),
        }
    }

    async fn save_snippet(&self, draft: &SnippetDraft) -> Result<String, AppError> {
        match self {
            Target::Host(client) => return client.save_snippet(draft).await,
            Target::Local { snippets, .. } => return Ok(snippets.save(draft)?.id),
        }
    }

    async fn delete_snippet(&self, id: &str) -> Result<(), AppError> {
        match self {
            Target::Host(client) => return client.delete_snippet(id).await,
            Target::Local { snippets, .. } => return snippets.delete(id),
        }
    }

    async fn stats(&self) -> Result<UsageStats, AppError> {
        match self {
            Target::Host(client) => return client.stats().await,
            Target::Local { stats, .. } => return stats.get(),
        }
    }
}

fn print_warnings(warnings: Vec<AppError>) {
    for warning in warnings {
        eprintln!("{}", render_warning(&format!("usage stats not recorded: {warning}")));
    }
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

/// `--input` wins, then `--file`, then piped stdin. An interactive terminal
/// yields empty input and leaves the complaint to validation.
async fn read_input(matches: &ArgMatches) -> Result<String> {
    if let Some(input) = matches.get_one::<String>("input") {
        return Ok(input.to_string());
    }

    if let Some(file) = matches.get_one::<String>("file") {
        return Ok(fs::read_to_string(file).await?);
    }

    if io::stdin().is_terminal() {
        return Ok("".to_string());
    }

    let mut res = String::new();
    tokio::io::stdin().read_to_string(&mut res).await?;
    return Ok(res);
}

fn format_snippet(snippet: &Snippet) -> String {
    let mut line = snippet
        .code
        .split('\n')
        .next()
        .unwrap_or_default()
        .to_string();

    if line.chars().count() >= 70 {
        line = format!("{}...", line.chars().take(67).collect::<String>());
    }

    return format!(
        "- (ID: {}) {}, {}, Lang: {}, {line}",
        snippet.id,
        snippet.created_at.to_rfc3339(),
        snippet.title,
        snippet.language,
    );
}

async fn run_action(matches: &ArgMatches) -> Result<()> {
    let action_id = matches
        .get_one::<String>("action")
        .map(|action| return action.to_string())
        .unwrap_or_default();
    let action = CodeAction::resolve(&action_id)?;
    let language = Config::get(ConfigKey::Language);
    let input = read_input(matches).await?;

    let target = Target::from_matches(matches)?;
    let dispatcher = ActionDispatcher::new(target.gateway()?);
    let outcome = dispatcher
        .run(&ActionRequest::new(action, &language, &input))
        .await?;

    println!("{}", render_segments(&outcome.segments));
    print_warnings(record_usage(target.recorder(), UsageKind::Action(action)).await);

    if matches.get_flag("save") {
        let draft = SnippetDraft::from_outcome(action, &language, &outcome.raw);
        let id = target.save_snippet(&draft).await?;
        eprintln!("{}", Paint::green(format!("Saved snippet {id}")));
    }

    if let Some(selection) = matches.get_one::<String>("copy-code") {
        let code = CodeBlocks::from_segments(&outcome.segments).select(selection)?;
        ClipboardService::set(&code)?;
        eprintln!("{}", Paint::green("Copied code to clipboard"));
    } else if matches.get_flag("copy") {
        ClipboardService::set(&outcome.raw)?;
        eprintln!("{}", Paint::green("Copied result to clipboard"));
    }

    return Ok(());
}

async fn run_chat(matches: &ArgMatches) -> Result<()> {
    let target = Target::from_matches(matches)?;
    let dispatcher = ActionDispatcher::new(target.gateway()?);

    let greeting = Message::greeting();
    println!("{}\n", greeting.content);
    let mut messages = vec![greeting];

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(Paint::blue("> ").to_string().as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" || line == "/q" {
            break;
        }

        messages.push(Message::user(line));
        match dispatcher.chat(&messages).await {
            Ok(outcome) => {
                println!("\n{}\n", render_segments(&outcome.segments));
                messages.push(Message::assistant(&outcome.raw));
                print_warnings(record_usage(target.recorder(), UsageKind::Chat).await);
            }
            Err(err) => {
                // A failed turn leaves the conversation as it was.
                messages.pop();
                eprintln!("{}\n", Paint::red(err.to_string()));
            }
        }
    }

    return Ok(());
}

async fn run_snippets(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("list", list_matches)) => {
            let snippets = Target::from_matches(list_matches)?.snippets().await?;
            if snippets.is_empty() {
                println!("There are no snippets saved yet.");
            } else {
                let res = snippets
                    .iter()
                    .map(format_snippet)
                    .collect::<Vec<String>>()
                    .join("\n");
                println!("{res}");
            }
        }
        Some(("save", save_matches)) => {
            let code = read_input(save_matches).await?;
            let title = save_matches
                .get_one::<String>("title")
                .map(|title| return title.to_string())
                .unwrap_or_else(|| return "Snippet".to_string());

            let draft = SnippetDraft {
                title,
                language: Config::get(ConfigKey::Language),
                code,
            };
            let id = Target::from_matches(save_matches)?
                .save_snippet(&draft)
                .await?;
            println!("Saved snippet {id}");
        }
        Some(("delete", delete_matches)) => {
            let id = delete_matches
                .get_one::<String>("id")
                .map(|id| return id.to_string())
                .unwrap_or_default();
            Target::from_matches(delete_matches)?
                .delete_snippet(&id)
                .await?;
            println!("Deleted snippet {id}");
        }
        _ => {
            subcommand_snippets().print_long_help()?;
        }
    }

    return Ok(());
}

async fn run_stats(matches: &ArgMatches) -> Result<()> {
    let stats = match matches.subcommand() {
        Some(("increment", increment_matches)) => {
            let field = increment_matches
                .get_one::<String>("field")
                .map(|field| return field.parse::<StatField>())
                .transpose()?;
            let Some(field) = field else {
                bail!("A field is required");
            };
            let value = increment_matches
                .get_one::<f64>("value")
                .copied()
                .unwrap_or(1.0);

            Target::from_matches(increment_matches)?
                .recorder()
                .increment(field, value)
                .await?
        }
        _ => Target::from_matches(matches)?.stats().await?,
    };

    println!("Code generated:  {}", stats.code_generated);
    println!("Tasks completed: {}", stats.tasks_completed);
    println!("Time saved:      {}h", stats.time_saved);
    return Ok(());
}

async fn run_serve(matches: &ArgMatches) -> Result<()> {
    let store = if matches.get_flag("in-memory") {
        StoreManager::in_memory()
    } else {
        open_store()?
    };

    let state = AppState {
        gateway: GatewayManager::get(GatewayTarget::Provider)?,
        snippets: Snippets::new(store.clone()),
        stats: Stats::new(store),
        access_token: Config::get(ConfigKey::AccessToken),
        default_language: Config::get(ConfigKey::Language),
    };

    return server::serve(state).await;
}

fn arg_local() -> Arg {
    return Arg::new("local")
        .long("local")
        .help("Skip the host. Call the provider directly and use the local data directory.")
        .action(ArgAction::SetTrue);
}

fn arg_input() -> Arg {
    return Arg::new("input")
        .short('i')
        .long("input")
        .num_args(1)
        .help("Input text. Reads --file or stdin when omitted.");
}

fn arg_file() -> Arg {
    return Arg::new("file")
        .short('f')
        .long("file")
        .num_args(1)
        .conflicts_with("input")
        .help("Read the input from a file.");
}

fn arg_config(key: ConfigKey, help: String) -> Arg {
    let env = format!(
        "CODEACTION_{}",
        key.to_string().to_uppercase().replace('-', "_")
    );

    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env)
        .num_args(1)
        .help(help)
        .global(true);
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
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

fn subcommand_serve() -> Command {
    return Command::new("serve")
        .about("Start the HTTP host that holds the provider credential and stores snippets and stats.")
        .arg(
            Arg::new("in-memory")
                .long("in-memory")
                .help("Keep snippets and stats in memory instead of the data directory.")
                .action(ArgAction::SetTrue),
        );
}

fn subcommand_run() -> Command {
    return Command::new("run")
        .about("Run a single code action and print the result.")
        .arg(
            Arg::new("action")
                .short('a')
                .long("action")
                .num_args(1)
                .required(true)
                .help("The code action to run.")
                .value_parser(PossibleValuesParser::new(CodeAction::VARIANTS)),
        )
        .arg(arg_input())
        .arg(arg_file())
        .arg(
            Arg::new("save")
                .long("save")
                .help("Save the result as a snippet.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("copy")
                .long("copy")
                .help("Copy the whole result to the clipboard.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("copy-code")
                .long("copy-code")
                .num_args(0..=1)
                .default_missing_value("")
                .value_name("BLOCKS")
                .help("Copy code blocks to the clipboard: `2`, `1,3` or `2..4`. Omit the value for the last block."),
        )
        .arg(arg_local());
}

fn subcommand_chat() -> Command {
    return Command::new("chat")
        .about("Start a conversation. Type /quit to leave.")
        .arg(arg_local());
}

fn subcommand_snippets() -> Command {
    return Command::new("snippets")
        .about("Manage saved snippets.")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("List all snippets, most recent first.")
                .arg(arg_local()),
        )
        .subcommand(
            Command::new("save")
                .about("Save code as a snippet.")
                .arg(
                    Arg::new("title")
                        .short('t')
                        .long("title")
                        .num_args(1)
                        .help("Snippet title."),
                )
                .arg(arg_input())
                .arg(arg_file())
                .arg(arg_local()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a snippet by ID.")
                .arg(
                    Arg::new("id")
                        .long("id")
                        .num_args(1)
                        .required(true)
                        .help("Snippet ID"),
                )
                .arg(arg_local()),
        );
}

fn subcommand_stats() -> Command {
    return Command::new("stats")
        .about("Show usage statistics.")
        .arg(arg_local())
        .subcommand(
            Command::new("increment")
                .about("Add to a single usage counter.")
                .arg(
                    Arg::new("field")
                        .long("field")
                        .num_args(1)
                        .required(true)
                        .value_parser(PossibleValuesParser::new(StatField::VARIANTS)),
                )
                .arg(
                    Arg::new("value")
                        .long("value")
                        .num_args(1)
                        .value_parser(value_parser!(f64))
                        .help("Amount to add. [default: 1]"),
                )
                .arg(arg_local()),
        );
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("codeaction")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(subcommand_serve())
        .subcommand(subcommand_run())
        .subcommand(subcommand_chat())
        .subcommand(subcommand_snippets())
        .subcommand(subcommand_stats())
        .subcommand(subcommand_config())
        .subcommand(subcommand_completions())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("CODEACTION_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            arg_config(
                ConfigKey::Language,
                format!("Language of the code passed to actions. [default: {}]", Config::default(ConfigKey::Language)),
            )
            .short('l'),
        )
        .arg(
            arg_config(
                ConfigKey::Model,
                format!("Codestral model used for completions. [default: {}]", Config::default(ConfigKey::Model)),
            )
            .short('m'),
        )
        .arg(arg_config(
            ConfigKey::ProviderURL,
            format!("Codestral API URL. Can be swapped to a compatible provider. [default: {}]", Config::default(ConfigKey::ProviderURL)),
        ))
        .arg(arg_config(
            ConfigKey::ProviderToken,
            "Codestral API key. Falls back to the CODESTRAL_API_KEY environment variable.".to_string(),
        ))
        .arg(arg_config(
            ConfigKey::UpstreamTimeout,
            format!("Time to wait in milliseconds for the provider to answer. [default: {}]", Config::default(ConfigKey::UpstreamTimeout)),
        ))
        .arg(arg_config(
            ConfigKey::ListenAddr,
            format!("Address the host listens on. [default: {}]", Config::default(ConfigKey::ListenAddr)),
        ))
        .arg(arg_config(
            ConfigKey::AccessToken,
            "Bearer token the host requires on every route except /health. Unset leaves the host open.".to_string(),
        ))
        .arg(arg_config(
            ConfigKey::ProxyURL,
            format!("URL of the host client commands talk to. [default: {}]", Config::default(ConfigKey::ProxyURL)),
        ))
        .arg(arg_config(
            ConfigKey::ProxyToken,
            "Bearer token client commands send to the host.".to_string(),
        ))
        .arg(arg_config(
            ConfigKey::DataDir,
            format!("Directory holding snippets and stats. [default: {}]", Config::default(ConfigKey::DataDir)),
        ))
        .arg(arg_config(
            ConfigKey::LogDir,
            "Write JSON logs to this directory instead of stderr.".to_string(),
        ));
}

pub async fn parse() -> Result<()> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(());
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(());
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(());
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(());
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(());
            }
        },
        _ => {}
    }

    let Some((name, subcmd_matches)) = matches.subcommand() else {
        build().print_long_help()?;
        return Ok(());
    };

    Config::load(build(), vec![&matches, subcmd_matches]).await?;
    let filter = if name == "serve" {
        SERVE_LOG_FILTER
    } else {
        CLIENT_LOG_FILTER
    };
    let _guard = logging::init(filter);

    match name {
        "serve" => run_serve(subcmd_matches).await?,
        "run" => run_action(subcmd_matches).await?,
        "chat" => run_chat(subcmd_matches).await?,
        "snippets" => run_snippets(subcmd_matches).await?,
        "stats" => run_stats(subcmd_matches).await?,
        _ => build().print_long_help()?,
    }

    return Ok(());
}
