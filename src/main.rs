// SPDX-License-Identifier: MPL-2.0
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use vidinspect::config::{self, PipelineConfig};
use vidinspect::media::{export_frame, frame_file_name, ExportFormat};
use vidinspect::video_player::{Player, SyntheticSource};
use vidinspect::workspace::{paths, WorkspaceState};

const HELP: &str = "\
vidinspect - frame-accurate video inspection

USAGE:
  vidinspect [OPTIONS] [FILE]

OPTIONS:
  --config-dir DIR   Directory holding settings.toml
  --data-dir DIR     Directory holding workspace state
  --steps N          Step forward N frames after opening (default 0)
  --seek PCT         Seek to PCT percent before stepping
  --reverse N        Step backward N frames at the end
  --play             Play to the end of the stream instead of stepping
  --export DIR       Write every displayed frame as PNG into DIR
  --synthetic N      Use a generated N-frame stream instead of FILE
  -h, --help         Print this help
";

/// Give up waiting for a frame after this long without progress.
const STALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct Flags {
    config_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    steps: usize,
    seek: Option<f64>,
    reverse: usize,
    play: bool,
    export: Option<PathBuf>,
    synthetic: Option<usize>,
    file: Option<PathBuf>,
}

fn parse_flags() -> Result<Option<Flags>, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let flags = Flags {
        config_dir: args.opt_value_from_str("--config-dir")?,
        data_dir: args.opt_value_from_str("--data-dir")?,
        steps: args.opt_value_from_str("--steps")?.unwrap_or(0),
        seek: args.opt_value_from_str("--seek")?,
        reverse: args.opt_value_from_str("--reverse")?.unwrap_or(0),
        play: args.contains("--play"),
        export: args.opt_value_from_str("--export")?,
        synthetic: args.opt_value_from_str("--synthetic")?,
        file: args.opt_free_from_str()?,
    };

    let rest = args.finish();
    if !rest.is_empty() {
        eprintln!("ignoring extra arguments: {rest:?}");
    }
    Ok(Some(flags))
}

/// Prints and optionally exports the frame the player just displayed.
struct Reporter<'a> {
    export_dir: Option<&'a Path>,
    stem: String,
    exported: usize,
}

impl Reporter<'_> {
    fn report(&mut self, player: &Player) {
        let Some(frame) = player.current_frame() else {
            return;
        };
        let secs = player
            .stream_info()
            .map_or(0.0, |info| info.pts_to_micros(frame.pts) as f64 / 1_000_000.0);
        println!(
            "pts {:>10}  t {:>9.3}s  progress {:>5.1}%",
            frame.pts,
            secs,
            player.play_state().progress
        );

        if let Some(dir) = self.export_dir {
            let path = dir.join(frame_file_name(&self.stem, frame.pts, ExportFormat::Png));
            match export_frame(frame, &path, Some(ExportFormat::Png)) {
                Ok(()) => self.exported += 1,
                Err(e) => log::warn!("{e}"),
            }
        }
    }
}

/// Polls the player until it reports an update. Returns false at the end of
/// the stream or when nothing arrives for a while.
fn wait_for_update(player: &mut Player) -> bool {
    let deadline = Instant::now() + STALL_TIMEOUT;
    while Instant::now() < deadline {
        if player.has_update(Instant::now()) {
            return true;
        }
        if player.at_end() {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    log::warn!("no frame within {STALL_TIMEOUT:?}");
    false
}

fn run(flags: &Flags, player: &mut Player) {
    let mut reporter = Reporter {
        export_dir: flags.export.as_deref(),
        stem: flags
            .file
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .unwrap_or("synthetic")
            .to_string(),
        exported: 0,
    };

    if let Some(dir) = reporter.export_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::error!("cannot create {}: {e}", dir.display());
            reporter.export_dir = None;
        }
    }

    if wait_for_update(player) {
        reporter.report(player);
    }

    if let Some(percent) = flags.seek {
        player.seek_progress(percent, false);
        if wait_for_update(player) {
            reporter.report(player);
        }
    }

    if flags.play {
        player.resume();
        while wait_for_update(player) {
            reporter.report(player);
        }
        player.pause();
    } else {
        for _ in 0..flags.steps {
            player.step_forward();
            if !wait_for_update(player) {
                break;
            }
            reporter.report(player);
        }
    }

    for _ in 0..flags.reverse {
        player.step_backward();
        if !wait_for_update(player) {
            break;
        }
        reporter.report(player);
    }

    let window = player.window_stats();
    let pool = player.pool_stats();
    log::info!(
        "window: {} insertions, {} evictions, {} discontinuities; pool: {} allocated, {} recycled; {} exported",
        window.insertions,
        window.evictions,
        window.discontinuities,
        pool.allocated,
        pool.recycled,
        reporter.exported
    );
}

fn main() -> ExitCode {
    let flags = match parse_flags() {
        Ok(Some(flags)) => flags,
        Ok(None) => {
            print!("{HELP}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {e}\n\n{HELP}");
            return ExitCode::from(2);
        }
    };

    let overrides_applied =
        paths::init_cli_overrides(flags.data_dir.clone(), flags.config_dir.clone());
    let (config, config_warning) = config::load();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level()))
        .format_timestamp_millis()
        .init();

    if !overrides_applied {
        log::warn!("--data-dir/--config-dir ignored: directories were already resolved");
    }
    if let Some(warning) = config_warning {
        log::warn!("{warning}");
    }

    let (mut workspace, state_warning) = WorkspaceState::load();
    if let Some(warning) = state_warning {
        log::warn!("{warning}");
    }

    let mut player = Player::new(PipelineConfig::from(&config));
    let opened = match (flags.synthetic, flags.file.as_deref()) {
        (Some(frames), _) => player.start(Box::new(SyntheticSource::new(frames).with_size(64, 36))),
        (None, Some(file)) => player.open(file),
        (None, None) => {
            eprint!("{HELP}");
            return ExitCode::from(2);
        }
    };

    let info = match opened {
        Ok(info) => info,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "{}x{}, {} frames, time base {}/{}",
        info.width,
        info.height,
        info.frame_count,
        info.time_base.num,
        info.time_base.den
    );

    run(&flags, &mut player);
    player.stop();

    if let Some(file) = flags.file.as_deref().filter(|_| flags.synthetic.is_none()) {
        let folder = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        workspace.push_recent_folder_of(&folder);
        workspace.last_stream = Some(info);
        if let Some(warning) = workspace.save() {
            log::warn!("{warning}");
        }
    }

    ExitCode::SUCCESS
}
