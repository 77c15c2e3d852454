use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use indicatif::{ProgressBar, ProgressStyle};
use meteo_client::config::ClientConfig;
use meteo_client::core::engine::DownloadEngine;
use meteo_client::core::events::DownloadEvent;
use meteo_client::core::model::{Item, Location, WeatherSample};
use meteo_client::core::state::AsyncState;
use meteo_client::i18n::{get_messages, Locale, Messages};
use meteo_client::repository::{DownloadRepository, ItemRepository, WeatherRepository};
use meteo_client::transport::http::ReqwestTransport;
use meteo_client::transport::Transport;
use meteo_client::viewmodel::{DownloadViewModel, DownloadedFile, ItemsViewModel, WeatherViewModel};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tracing_subscriber::EnvFilter;

fn build_cli() -> Command {
    let weather = Command::new("weather")
        .about("Current weather for a department or a GPS position")
        .arg(
            Arg::new("dept")
                .long("dept")
                .help("Department number, e.g. 75")
                .num_args(1)
                .conflicts_with_all(["lat", "lon"])
                .required_unless_present_all(["lat", "lon"]),
        )
        .arg(Arg::new("lat").long("lat").help("Latitude").num_args(1).requires("lon").allow_negative_numbers(true))
        .arg(Arg::new("lon").long("lon").help("Longitude").num_args(1).requires("lat").allow_negative_numbers(true));

    let items = Command::new("items")
        .about("Manage the remote item list")
        .subcommand_required(true)
        .subcommand(Command::new("list").about("List items"))
        .subcommand(
            Command::new("add")
                .about("Add an item")
                .arg(Arg::new("name").required(true).num_args(1)),
        )
        .subcommand(
            Command::new("update")
                .about("Rename an item")
                .arg(Arg::new("id").required(true).num_args(1))
                .arg(Arg::new("name").required(true).num_args(1)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete an item")
                .arg(Arg::new("id").required(true).num_args(1)),
        );

    let download = Command::new("download")
        .about("Download a video through the server")
        .arg(Arg::new("url").help("Video URL").required(true).num_args(1))
        .arg(
            Arg::new("out_dir")
                .long("out-dir")
                .help("Output directory")
                .default_value("./downloads")
                .num_args(1),
        );

    Command::new("meteo-client")
        .about("Client for the meteo API: weather, items, video downloads")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("base_url")
                .long("base-url")
                .env("METEO_API_URL")
                .help("API root")
                .global(true)
                .num_args(1),
        )
        .arg(
            Arg::new("user_agent")
                .long("user-agent")
                .help("User-Agent header")
                .global(true)
                .num_args(1),
        )
        .arg(
            Arg::new("timeout_secs")
                .long("timeout-secs")
                .help("Timeout in seconds for JSON calls")
                .global(true)
                .num_args(1),
        )
        .arg(
            Arg::new("locale")
                .long("locale")
                .env("METEO_LOCALE")
                .help("Output language (en, fr)")
                .global(true)
                .num_args(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log at debug level unless RUST_LOG is set")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(weather)
        .subcommand(items)
        .subcommand(download)
}

fn client_config(matches: &ArgMatches) -> anyhow::Result<ClientConfig> {
    let mut cfg = ClientConfig::new();
    if let Some(url) = matches.get_one::<String>("base_url") {
        cfg = cfg.with_base_url(url.clone());
    }
    if let Some(ua) = matches.get_one::<String>("user_agent") {
        cfg = cfg.with_user_agent(ua.clone());
    }
    if let Some(s) = matches.get_one::<String>("timeout_secs") {
        let secs: u64 = s.parse().with_context(|| format!("invalid --timeout-secs: {s}"))?;
        cfg = cfg.with_timeout(Duration::from_secs(secs));
    }
    Ok(cfg)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "meteo_client=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    let locale = matches
        .get_one::<String>("locale")
        .map(|s| Locale::from_str(s))
        .unwrap_or_default();
    let msgs = get_messages(locale);

    let cfg = client_config(&matches)?;
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&cfg).context("building HTTP client")?);
    tracing::debug!(transport = transport.name(), base_url = %cfg.base_url()?, "client ready");

    let ok = match matches.subcommand() {
        Some(("weather", m)) => run_weather(m, transport, msgs).await?,
        Some(("items", m)) => run_items(m, transport, msgs).await?,
        Some(("download", m)) => run_download(m, transport, &cfg, msgs).await?,
        _ => true,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run_weather(m: &ArgMatches, transport: Arc<dyn Transport>, msgs: &Messages) -> anyhow::Result<bool> {
    let vm = WeatherViewModel::new(Arc::new(WeatherRepository::new(transport)));

    if let Some(dept) = m.get_one::<String>("dept") {
        vm.fetch_region(dept);
    } else {
        let lat: f64 = m.get_one::<String>("lat").map(|s| s.parse::<f64>()).transpose()?.unwrap_or_default();
        let lon: f64 = m.get_one::<String>("lon").map(|s| s.parse::<f64>()).transpose()?.unwrap_or_default();
        vm.fetch_coordinates(lat, lon);
    }

    Ok(render(vm.settled().await, msgs, |sample| print_weather(&sample, msgs)))
}

async fn run_items(m: &ArgMatches, transport: Arc<dyn Transport>, msgs: &Messages) -> anyhow::Result<bool> {
    let vm = ItemsViewModel::new(Arc::new(ItemRepository::new(transport)));

    match m.subcommand() {
        Some(("add", s)) => vm.add(required(s, "name")?),
        Some(("update", s)) => vm.update(item_id(s)?, required(s, "name")?),
        Some(("delete", s)) => vm.delete(item_id(s)?),
        _ => vm.fetch(),
    }

    let state = vm.settled().await;
    if matches!(state, AsyncState::Empty) {
        println!("{}", msgs.items_empty);
        return Ok(true);
    }
    Ok(render(state, msgs, |items| print_items(&items, msgs)))
}

async fn run_download(
    m: &ArgMatches,
    transport: Arc<dyn Transport>,
    cfg: &ClientConfig,
    msgs: &Messages,
) -> anyhow::Result<bool> {
    let url = required(m, "url")?;
    let out_dir: PathBuf = required(m, "out_dir")?.into();
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let engine = DownloadEngine::new(transport, cfg.default_filename());
    let vm = DownloadViewModel::new(Arc::new(DownloadRepository::new(engine, cfg)?));

    let rx = vm.repository().engine().subscribe();
    let (done_tx, done_rx) = oneshot::channel();
    let ui_task = tokio::spawn(show_progress(rx, done_rx));

    vm.download(url, &out_dir);
    let state = vm.settled().await;
    let _ = done_tx.send(());
    let _ = ui_task.await;

    Ok(render(state, msgs, |file: DownloadedFile| {
        println!("{}: {} ({})", msgs.download_saved, file.file_path.display(), fmt_bytes(file.bytes_written));
    }))
}

/// Drives one progress bar from engine events until the download settles.
/// Queued events are drained before `done` is honoured.
async fn show_progress(mut rx: broadcast::Receiver<DownloadEvent>, mut done: oneshot::Receiver<()>) {
    let sty_spinner = ProgressStyle::with_template("{spinner:.green} {bytes} ({bytes_per_sec}) {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("|/-\\ ");
    let sty_bar = ProgressStyle::with_template("{bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta}) {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    let pb = ProgressBar::new_spinner();
    pb.set_style(sty_spinner);
    pb.enable_steady_tick(Duration::from_millis(120));

    loop {
        let evt = tokio::select! {
            biased;
            evt = rx.recv() => match evt {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "progress events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut done => break,
        };

        match evt {
            DownloadEvent::Started { file_path, total, .. } => {
                if let Some(t) = total {
                    pb.set_style(sty_bar.clone());
                    pb.set_length(t);
                }
                pb.set_message(file_path.display().to_string());
            }
            DownloadEvent::Progress { written, .. } => pb.set_position(written),
            DownloadEvent::Finished { bytes_written, .. } => {
                pb.set_position(bytes_written);
                pb.finish();
                return;
            }
            DownloadEvent::Failed { .. } => {
                pb.abandon();
                return;
            }
        }
    }
    pb.finish_and_clear();
}

/// Prints a settled state. Returns `false` when it is an error.
fn render<T>(state: AsyncState<T>, msgs: &Messages, on_value: impl FnOnce(T)) -> bool {
    match state {
        AsyncState::Success(v) => {
            on_value(v);
            true
        }
        AsyncState::Error(message) => {
            eprintln!("[{}] {}", msgs.error_prefix, message);
            false
        }
        AsyncState::Empty | AsyncState::Idle | AsyncState::Loading => {
            println!("{}", msgs.no_data);
            true
        }
    }
}

fn print_weather(sample: &WeatherSample, msgs: &Messages) {
    match &sample.location {
        Location::Region(code) => println!("{}: {}", msgs.region, code),
        Location::Coordinates { latitude, longitude } => {
            println!("{}: {:.4}, {:.4}", msgs.coordinates, latitude, longitude)
        }
    }
    let unknown = || msgs.value_unknown.to_string();
    println!("{}: {}", msgs.temperature, sample.temperature.map(|t| format!("{t:.1} °C")).unwrap_or_else(unknown));
    println!("{}: {}", msgs.windspeed, sample.windspeed.map(|w| format!("{w:.1} km/h")).unwrap_or_else(unknown));
    println!("{}: {}", msgs.winddirection, sample.winddirection.map(|d| format!("{d}°")).unwrap_or_else(unknown));
    println!("{}: {}", msgs.weathercode, sample.weathercode.clone().unwrap_or_else(unknown));
    println!("{}: {}", msgs.observed_at, sample.time.clone().unwrap_or_else(unknown));
}

fn print_items(items: &[Item], msgs: &Messages) {
    println!("{}:", msgs.items_header);
    for item in items {
        match item.id {
            Some(id) => println!("- [{}] {}", id, item.name),
            None => println!("- [{}] {}", msgs.value_unknown, item.name),
        }
    }
}

fn required<'a>(m: &'a ArgMatches, id: &str) -> anyhow::Result<&'a str> {
    m.get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing argument: {id}"))
}

fn item_id(m: &ArgMatches) -> anyhow::Result<i64> {
    let raw = required(m, "id")?;
    raw.parse().with_context(|| format!("invalid item id: {raw}"))
}

fn fmt_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.2}GiB", f / GB)
    } else if f >= MB {
        format!("{:.2}MiB", f / MB)
    } else if f >= KB {
        format!("{:.2}KiB", f / KB)
    } else {
        format!("{}B", n)
    }
}
