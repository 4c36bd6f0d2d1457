use std::io;
use std::time::{Duration, Instant};

use clap::Parser;
use ratatui::layout::Rect;
use term_overlay::overlay::AnchorPoint;
use term_overlay::{
    Area, DialogOptions, EngineConfig, LayoutOracle, Modality, OverlayEngine, OverlayError,
    OwnerEvent, OwnerId, PopupAnchor, PopupOptions, ViewId,
};

#[derive(Parser, Debug)]
#[command(
    name = "overlay-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Headless benchmark for blocking, glass-pane and render-plan queries"
)]
struct BenchCli {
    /// How long to run the benchmark.
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "SECONDS",
        default_value_t = 3.0
    )]
    duration_seconds: f64,

    /// Number of views laid out side by side.
    #[arg(short = 'v', long = "views", value_name = "COUNT", default_value_t = 8)]
    views: u32,

    /// Dialogs stacked on every view.
    #[arg(short = 's', long = "stack", value_name = "COUNT", default_value_t = 3)]
    stack: u32,

    /// Overlays nested on top of each view's stack (dialogs and popups alternating).
    #[arg(short = 'n', long = "nesting", value_name = "DEPTH", default_value_t = 4)]
    nesting: u32,
}

struct BenchConfig {
    duration: Duration,
    views: u32,
    stack: u32,
    nesting: u32,
}

impl TryFrom<&BenchCli> for BenchConfig {
    type Error = String;

    fn try_from(cli: &BenchCli) -> Result<Self, Self::Error> {
        if !(0.1..=600.0).contains(&cli.duration_seconds) {
            return Err("duration must be between 0.1 and 600 seconds".to_string());
        }
        if !(1..=256).contains(&cli.views) {
            return Err("views must be between 1 and 256".to_string());
        }
        if cli.stack == 0 || cli.stack > 64 || cli.nesting > 64 {
            return Err("stack must be 1..=64 and nesting at most 64".to_string());
        }
        Ok(Self {
            duration: Duration::from_secs_f64(cli.duration_seconds),
            views: cli.views,
            stack: cli.stack,
            nesting: cli.nesting,
        })
    }
}

fn main() -> io::Result<()> {
    let args = BenchCli::parse();
    let config = BenchConfig::try_from(&args)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;
    let stats = run_benchmark(&config).map_err(io::Error::other)?;
    println!("{}", stats.final_report(&config));
    Ok(())
}

type Engine = OverlayEngine<LayoutOracle>;

fn build_engine(config: &BenchConfig) -> Result<(Engine, Vec<OwnerId>), OverlayError> {
    let width = (config.views * 40).min(u16::MAX as u32) as u16;
    let mut oracle = LayoutOracle::new(Rect::new(0, 0, width, 60));
    let mut owners = vec![OwnerId::Root];
    for i in 0..config.views {
        let x = (i * 40).min(u16::MAX as u32 - 40) as u16;
        oracle.insert_view(ViewId(i + 1), Rect::new(x, 0, 40, 60), Area::Main);
        owners.push(OwnerId::View(ViewId(i + 1)));
    }
    let mut engine = Engine::new(oracle, EngineConfig::default());
    for i in 0..config.views {
        let view = OwnerId::View(ViewId(i + 1));
        let mut top = view;
        for _ in 0..config.stack {
            top = engine
                .open_dialog(DialogOptions::new().context(view).size(24, 10))?
                .id
                .into();
        }
        for depth in 0..config.nesting {
            top = if depth % 2 == 0 {
                let anchor = PopupAnchor::point(AnchorPoint::top_left(1, 1));
                engine
                    .open_popup(
                        PopupOptions::new(anchor)
                            .context(top)
                            .close_strategy(true, false),
                    )?
                    .id
                    .into()
            } else {
                engine
                    .open_dialog(DialogOptions::new().context(top).size(20, 6))?
                    .id
                    .into()
            };
            owners.push(top);
        }
    }
    Ok((engine, owners))
}

fn run_benchmark(config: &BenchConfig) -> Result<BenchStats, OverlayError> {
    let (mut engine, owners) = build_engine(config)?;
    let mut stats = BenchStats::new(engine.registry().len());
    let first_view = OwnerId::View(ViewId(1));
    let mut round: u64 = 0;

    while stats.elapsed() < config.duration {
        let round_start = Instant::now();
        for owner in &owners {
            if engine.is_blocked(*owner) {
                stats.blocked_hits += 1;
            }
            stats.panes += engine.glass_panes_of(*owner).len() as u64;
            stats.queries += 2;
        }
        stats.drawn += engine.render_plan().len() as u64;

        // Alternate an application-modal and a hide/reattach cycle so the
        // queue and visibility paths are exercised too.
        if round % 2 == 0 {
            let modal = engine
                .open_dialog(DialogOptions::new().modality(Modality::ApplicationBlocking))?;
            engine.close(modal.id, None)?;
        } else {
            for active in [false, true] {
                engine.handle_owner_event(OwnerEvent::Activation {
                    owner: first_view,
                    active,
                })?;
            }
        }
        engine.take_events();
        stats.record_round(round_start.elapsed());
        round = round.wrapping_add(1);
    }
    stats.mark_completed();
    Ok(stats)
}

struct BenchStats {
    start: Instant,
    completed_at: Option<Instant>,
    overlays: usize,
    rounds: u64,
    queries: u64,
    blocked_hits: u64,
    panes: u64,
    drawn: u64,
    total_round_time: Duration,
    slowest_round: Duration,
}

impl BenchStats {
    fn new(overlays: usize) -> Self {
        Self {
            start: Instant::now(),
            completed_at: None,
            overlays,
            rounds: 0,
            queries: 0,
            blocked_hits: 0,
            panes: 0,
            drawn: 0,
            total_round_time: Duration::ZERO,
            slowest_round: Duration::ZERO,
        }
    }

    fn elapsed(&self) -> Duration {
        match self.completed_at {
            Some(done) => done.duration_since(self.start),
            None => self.start.elapsed(),
        }
    }

    fn mark_completed(&mut self) {
        self.completed_at = Some(Instant::now());
    }

    fn record_round(&mut self, time: Duration) {
        self.rounds = self.rounds.saturating_add(1);
        self.total_round_time += time;
        if time > self.slowest_round {
            self.slowest_round = time;
        }
    }

    fn average_round_us(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        (self.total_round_time.as_secs_f64() / self.rounds as f64) * 1_000_000.0
    }

    fn final_report(&self, config: &BenchConfig) -> String {
        let elapsed = self.elapsed().as_secs_f64();
        let queries_per_second = if elapsed > 0.0 {
            self.queries as f64 / elapsed
        } else {
            0.0
        };

        indoc::formatdoc!(
            r#"
            Overlay bench finished.
            Layout: {views} views, {stack} stacked + {nesting} nested per view ({overlays} overlays)
            Duration: {elapsed:.2}s (target {target:.2}s)
            Rounds: {rounds} | Avg round: {avg:.1} us | Worst: {worst:.1} us
            Queries: {queries} (~{qps:.0}/s) | Blocked: {blocked} | Glass panes: {panes}
            Overlays drawn: {drawn}
            "#,
            views = config.views,
            stack = config.stack,
            nesting = config.nesting,
            overlays = self.overlays,
            elapsed = elapsed,
            target = config.duration.as_secs_f64(),
            rounds = self.rounds,
            avg = self.average_round_us(),
            worst = self.slowest_round.as_secs_f64() * 1_000_000.0,
            queries = self.queries,
            qps = queries_per_second,
            blocked = self.blocked_hits,
            panes = self.panes,
            drawn = self.drawn,
        )
    }
}
