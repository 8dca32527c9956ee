// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod config;
mod location;
mod report;
mod ticker;

use std::error::Error;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, warn};
use mimalloc::MiMalloc;
use severe_client::outlook::validate_coordinates;
use severe_client::{
    graphic_url, mesoanalysis_url, AlertPayload, Client, ForecastDay, MockFeed, Product, Satellite,
    SatelliteView, Sector,
};

use config::AppConfig;
use location::{LocationState, PresetOutcome};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "severe-dash", version, about = "SPC outlook and NWS severe alert dashboard")]
struct Cli {
    /// Preset city to look up instead of the saved location
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    city: Option<String>,

    /// Latitude of a custom location
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude of a custom location
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Categorical risk and hazard percentages for the location
    Outlook,
    /// Active severe watches and warnings nationwide
    Alerts(AlertSource),
    /// Alerts as a single ticker line
    Ticker(AlertSource),
    /// Year-to-date national warning counts
    Counts {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Latest observation near the location
    Obs,
    /// List preset cities
    Cities,
    /// Select and save a preset city
    Use { city: String },
    /// Open the SPC outlook graphic for a day in the browser
    Open { day: u8 },
    /// Latest GOES satellite image URL and whether it is being served
    Sat {
        /// east, west, GOES16 or GOES18
        #[arg(long, default_value = "east")]
        satellite: Satellite,

        /// CONUS, FD, M1 or M2
        #[arg(long, default_value = "CONUS")]
        sector: Sector,

        /// Product code such as GEOCOLOR, AIRMASS or BAND13
        #[arg(long, default_value = "GEOCOLOR")]
        product: Product,

        /// Open the image in the browser
        #[arg(long)]
        open: bool,

        /// List satellites, sectors and products
        #[arg(long)]
        list: bool,
    },
    /// SPC mesoanalysis page
    Meso {
        #[arg(long, default_value_t = 19)]
        sector: u32,

        /// Parameter code, e.g. pmsl or mlcp
        #[arg(long, default_value = "pmsl")]
        parameter: String,

        /// Open the page in the browser
        #[arg(long)]
        open: bool,
    },
    /// Print the configuration file path
    ConfigPath,
}

#[derive(Args, Debug)]
struct AlertSource {
    /// Replay the scripted outbreak instead of the live feed
    #[arg(long)]
    mock: bool,

    /// Mock frame to show
    #[arg(long, default_value_t = 0)]
    step: u64,

    /// Mock reference time (RFC 3339), defaults to now
    #[arg(long)]
    seed: Option<DateTime<Utc>>,

    /// Number of refreshes to show; mock replays advance one frame each time
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Seconds between refreshes
    #[arg(long, default_value_t = 60)]
    interval: u64,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn load_config() -> AppConfig {
    match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("could not load configuration, using defaults: {}", e);
            AppConfig::default()
        }
    }
}

fn mock_payload(feed: &MockFeed) -> AlertPayload {
    info!("mock alert frame {} of {}", feed.frame_index() + 1, MockFeed::frame_count());
    AlertPayload {
        alerts: feed.alerts(),
        had_error: false,
    }
}

/// Show `source.frames` alert payloads. Live refreshes drop the response
/// cache so each one reaches the feed.
fn watch_alerts(client: &Client, source: &AlertSource, config: &AppConfig, mut show: impl FnMut(&AlertPayload)) {
    let mock = source.mock || config.mock_alerts;
    let mut feed = MockFeed::new(source.step, source.seed.unwrap_or_else(Utc::now));

    for frame in 0..source.frames.max(1) {
        if frame > 0 {
            thread::sleep(Duration::from_secs(source.interval));
            if mock {
                feed = feed.next_step();
            } else {
                debug!("dropping {} cached responses", client.cached_responses());
                client.clear_cache();
            }
        }

        let payload = if mock {
            mock_payload(&feed)
        } else {
            client.alerts().alert_payload()
        };
        show(&payload);
    }
}

fn select_location(cli: &Cli, config: &AppConfig, client: &Client) -> Result<LocationState, Box<dyn Error>> {
    let mut location = LocationState::from_config(config);
    if let Some(city) = &cli.city {
        if location.apply_preset(config, city) == PresetOutcome::Unknown {
            eprintln!("Unknown city '{city}', using {}", location.label());
        }
    } else if let (Some(lat), Some(lon)) = (cli.lat, cli.lon) {
        validate_coordinates(lat, lon)?;
        let label = client.observations().nearest_city_label(lat, lon);
        location.set_custom(label, lat, lon)?;
    }
    Ok(location)
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut config = load_config();

    match &cli.command {
        Command::Cities => {
            for preset in &config.city_presets {
                let marker = if preset.name == config.city_key { "*" } else { " " };
                println!("{marker} {} ({:.4}, {:.4})", preset.name, preset.latitude, preset.longitude);
            }
            return Ok(());
        }
        Command::Use { city } => {
            let mut location = LocationState::from_config(&config);
            match location.apply_preset(&config, city) {
                PresetOutcome::Unknown => return Err(format!("unknown city '{city}'").into()),
                PresetOutcome::Unchanged => println!("{} is already selected", location.label()),
                PresetOutcome::Applied => {
                    location.store(&mut config);
                    config.save()?;
                    println!("Selected {}", location.label());
                }
            }
            return Ok(());
        }
        Command::Open { day } => {
            let url = ForecastDay::new(*day)
                .and_then(graphic_url)
                .ok_or_else(|| format!("no outlook graphic for day {day}"))?;
            info!("opening {url}");
            webbrowser::open(&url)?;
            return Ok(());
        }
        Command::Meso { sector, parameter, open } => {
            let url = mesoanalysis_url(*sector, parameter);
            println!("{url}");
            if *open {
                webbrowser::open(&url)?;
            }
            return Ok(());
        }
        Command::Sat { list: true, .. } => {
            print!("{}", report::render_satellite_choices());
            return Ok(());
        }
        Command::ConfigPath => {
            println!("{}", AppConfig::get_config_path()?.display());
            return Ok(());
        }
        _ => {}
    }

    let client = Client::new(config.client_config())?;
    let location = select_location(cli, &config, &client)?;
    let (lat, lon) = location.coordinates();

    match &cli.command {
        Command::Outlook => {
            let categorical = client.outlooks().categorical_summary(lat, lon)?;
            let summary = client.outlooks().summarize_location(lat, lon)?;
            print!("{}", report::render_outlook(location.label(), &categorical, &summary));
        }
        Command::Alerts(source) => {
            watch_alerts(&client, source, &config, |payload| {
                print!("{}", report::render_alerts(&payload.alerts, payload.had_error));
            });
        }
        Command::Ticker(source) => {
            let color = std::io::stdout().is_terminal();
            watch_alerts(&client, source, &config, |payload| {
                let ticker = ticker::build_ticker(payload);
                println!("{}", ticker.render_line(color));
                info!("scroll duration {}s", ticker.duration_secs);
            });
        }
        Command::Counts { year } => {
            let now = Utc::now();
            let year = year.unwrap_or_else(|| now.year());
            let tornado = client
                .tor_warning_count_ytd(year)
                .inspect_err(|e| warn!("tornado warning count unavailable: {}", e))
                .ok();
            let severe = client
                .svr_warning_count_ytd(year, now)
                .inspect_err(|e| warn!("severe thunderstorm warning count unavailable: {}", e))
                .ok();
            print!("{}", report::render_counts(year, tornado, severe));
        }
        Command::Obs => {
            let glance = client.observations().glance(lat, lon, Utc::now());
            print!("{}", report::render_glance(location.label(), &glance));
            if let Some(radar) = client.observations().nearest_radar_id(lat, lon) {
                println!("  Radar {radar}");
            }
        }
        Command::Sat {
            satellite,
            sector,
            product,
            open,
            ..
        } => {
            let view = SatelliteView {
                satellite: *satellite,
                sector: *sector,
                product: *product,
            };
            let url = client.satellite().latest_image_url(view);
            let available = client.satellite().image_available(&url);
            print!("{}", report::render_satellite(view, &url, available));
            if *open && available {
                webbrowser::open(&url)?;
            }
        }
        Command::Cities
        | Command::Use { .. }
        | Command::Open { .. }
        | Command::Meso { .. }
        | Command::ConfigPath => {}
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
