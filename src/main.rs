use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use glam::{DVec2, dvec2};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use trend_bubbles::trend::{ItemFilter, SizeMetric, parse_trends};
use trend_bubbles::{DragController, Item, NodePosition, SimResult, Simulation, SimulationConfig};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Trends JSON: a /trends or /timeline response, or a bare list
    #[arg(long)]
    input: PathBuf,

    /// Simulation config JSON; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SizeMetric::RealScore)]
    metric: SizeMetric,

    #[arg(long)]
    max_nodes: Option<usize>,

    #[arg(long, default_value_t = 0.0)]
    min_magnitude: f64,

    #[arg(long)]
    include_marketing: bool,

    #[arg(long, default_value_t = 5_000)]
    max_ticks: usize,

    /// Emit a frame every N ticks; 0 emits only the final frame
    #[arg(long, default_value_t = 0)]
    frame_every: u64,

    /// Fix a node in place, as ID=X,Y
    #[arg(long = "pin", value_parser = parse_placement)]
    pins: Vec<Placement>,

    /// Drag a node to a point, as ID=X,Y
    #[arg(long, value_parser = parse_placement)]
    drag: Option<Placement>,

    /// Ticks the scripted drag takes to reach its point
    #[arg(long, default_value_t = 60)]
    drag_ticks: usize,
}

#[derive(Clone, Debug, PartialEq)]
struct Placement {
    id: String,
    point: DVec2,
}

#[derive(Serialize)]
struct Frame<'a> {
    tick: u64,
    alpha: f64,
    nodes: Vec<NodePosition<'a>>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();
    check_placements(&args.pins, args.drag.as_ref())?;

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let trends = parse_trends(&raw)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    let filter = ItemFilter {
        metric: args.metric,
        min_magnitude: args.min_magnitude,
        max_nodes: args.max_nodes,
        include_marketing: args.include_marketing,
    };
    let items = filter.select(&trends);
    if items.is_empty() {
        warn!(trends = trends.len(), "no trends survived filtering");
    }

    let mut simulation = Simulation::new(config)?;
    seed_and_pin(&mut simulation, &items, &args.pins)?;
    info!(
        nodes = simulation.len(),
        metric = args.metric.label(),
        "laying out trends"
    );

    let stdout = io::stdout();
    let mut emitter = FrameEmitter::new(BufWriter::new(stdout.lock()), args.frame_every);

    if let Some(drag) = &args.drag {
        scripted_drag(&mut simulation, drag, args.drag_ticks, &mut emitter)?;
    }

    let mut taken = 0;
    while taken < args.max_ticks && !simulation.is_converged() {
        simulation.tick();
        taken += 1;
        emitter.on_tick(&simulation)?;
    }
    if !simulation.is_converged() {
        warn!(
            max_ticks = args.max_ticks,
            alpha = simulation.alpha(),
            "tick budget spent before convergence"
        );
    }

    emitter.finish(&simulation)?;
    info!(ticks = simulation.tick_count(), "layout finished");
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: SimulationConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config JSON in {}", path.display()))?;
    Ok(config)
}

/// A dragged node is released when the drag ends, which would silently
/// drop a fixed pin on the same node.
fn check_placements(pins: &[Placement], drag: Option<&Placement>) -> Result<()> {
    if let Some(drag) = drag {
        ensure!(
            pins.iter().all(|pin| pin.id != drag.id),
            "`{}` is both pinned and dragged; drop one of --pin or --drag",
            drag.id
        );
    }
    Ok(())
}

fn seed_and_pin(simulation: &mut Simulation, items: &[Item], pins: &[Placement]) -> SimResult<()> {
    simulation.seed(items)?;
    for pin in pins {
        simulation.pin(&pin.id, pin.point)?;
    }
    Ok(())
}

/// Drags a node from where it sits to the target in even steps, one tick
/// per step, then lets go.
fn scripted_drag<W: Write>(
    simulation: &mut Simulation,
    drag: &Placement,
    steps: usize,
    emitter: &mut FrameEmitter<W>,
) -> Result<()> {
    let start = simulation
        .node(&drag.id)
        .map(|node| node.position())
        .with_context(|| format!("cannot drag unknown node `{}`", drag.id))?;
    let mut controller = DragController::for_simulation(simulation);

    controller.on_drag_start(simulation, &drag.id, start)?;
    let steps = steps.max(1);
    for step in 1..=steps {
        let point = if step == steps {
            drag.point
        } else {
            start.lerp(drag.point, step as f64 / steps as f64)
        };
        controller.on_drag_move(simulation, &drag.id, point)?;
        simulation.tick();
        emitter.on_tick(simulation)?;
    }
    controller.on_drag_end(simulation, &drag.id)?;
    Ok(())
}

struct FrameEmitter<W: Write> {
    out: W,
    every: u64,
    last_emitted: Option<u64>,
}

impl<W: Write> FrameEmitter<W> {
    fn new(out: W, every: u64) -> Self {
        Self {
            out,
            every,
            last_emitted: None,
        }
    }

    fn on_tick(&mut self, simulation: &Simulation) -> Result<()> {
        if self.every > 0 && simulation.tick_count() % self.every == 0 {
            self.emit(simulation)?;
        }
        Ok(())
    }

    fn finish(&mut self, simulation: &Simulation) -> Result<()> {
        if self.last_emitted != Some(simulation.tick_count()) {
            self.emit(simulation)?;
        }
        self.out.flush().context("failed to flush frames")
    }

    fn emit(&mut self, simulation: &Simulation) -> Result<()> {
        let frame = Frame {
            tick: simulation.tick_count(),
            alpha: simulation.alpha(),
            nodes: simulation.snapshot(),
        };
        serde_json::to_writer(&mut self.out, &frame).context("failed to write frame")?;
        writeln!(self.out).context("failed to write frame")?;
        self.last_emitted = Some(frame.tick);
        Ok(())
    }
}

fn parse_placement(raw: &str) -> Result<Placement, String> {
    let (id, coords) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected ID=X,Y, got `{raw}`"))?;
    let (x, y) = coords
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y after `=`, got `{coords}`"))?;
    let x = x
        .trim()
        .parse::<f64>()
        .map_err(|error| format!("invalid x `{x}`: {error}"))?;
    let y = y
        .trim()
        .parse::<f64>()
        .map_err(|error| format!("invalid y `{y}`: {error}"))?;

    if id.is_empty() {
        return Err("node id must not be empty".to_owned());
    }
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("coordinates must be finite, got `{coords}`"));
    }

    Ok(Placement {
        id: id.to_owned(),
        point: dvec2(x, y),
    })
}
