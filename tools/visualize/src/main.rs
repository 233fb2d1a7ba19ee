//! Diagnostic visualizer: renders an `ExperimentReport` JSON to PNG images.
//!
//! Writes height.png, slope.png, growth.png, one `<model>_snapshot_<t>.png`
//! per captured snapshot, and cover.png (cover fraction over time, one line
//! per run).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colony_core::{CellState, ExperimentReport, Field, ModelKind, OccupancyGrid, RunReport};
use image::{Rgb, RgbImage};

#[derive(Parser, Debug)]
#[command(name = "visualize", about = "Render a colony-run report to PNG images")]
struct Args {
    /// Report JSON written by `colony-run run` or `colony-run compare`.
    #[arg(short, long, default_value = "data/compare.json")]
    input: PathBuf,

    /// Output directory.
    #[arg(short, long, default_value = "data/render")]
    out_dir: PathBuf,

    /// Pixels per grid cell.
    #[arg(short, long, default_value_t = 4)]
    scale: u32,
}

const CHART_W: u32 = 640;
const CHART_H: u32 = 320;
const CHART_MARGIN: u32 = 20;

// ── Colour helpers ────────────────────────────────────────────────────────────

/// [0, 1] → grayscale (0 = black, 1 = white).
fn gray(v: f32) -> [u8; 3] {
    let c = (v.clamp(0.0, 1.0) * 255.0) as u8;
    [c, c, c]
}

/// Height [0, 1] → green lowland to brown highland.
fn terrain_color(v: f32) -> [u8; 3] {
    let t = v.clamp(0.0, 1.0);
    let r = (60.0 + 120.0 * t) as u8;
    let g = (140.0 - 40.0 * t) as u8;
    let b = (60.0 + 20.0 * t) as u8;
    [r, g, b]
}

/// Probability [0, 1] → white to deep green.
fn growth_color(v: f32) -> [u8; 3] {
    let t = v.clamp(0.0, 1.0);
    let lo = (255.0 * (1.0 - t)) as u8;
    let g = (255.0 - 125.0 * t) as u8;
    [lo, g, lo]
}

fn model_color(model: ModelKind) -> Rgb<u8> {
    match model {
        ModelKind::Terrain => Rgb([200, 60, 40]),
        ModelKind::Neutral => Rgb([40, 90, 200]),
    }
}

// ── Rasterizers ───────────────────────────────────────────────────────────────

fn field_image(field: &Field, scale: u32, color: fn(f32) -> [u8; 3]) -> RgbImage {
    let mut img = RgbImage::new(field.width as u32 * scale, field.height as u32 * scale);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let v = field.get((y / scale) as usize, (x / scale) as usize);
        *px = Rgb(color(v));
    }
    img
}

/// Occupied cells in dark green over the terrain shaded in light gray.
fn grid_image(grid: &OccupancyGrid, height: &Field, scale: u32) -> RgbImage {
    let mut img = RgbImage::new(grid.width as u32 * scale, grid.height as u32 * scale);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let (r, c) = ((y / scale) as usize, (x / scale) as usize);
        *px = match grid.get(r, c) {
            CellState::Occupied => Rgb([20, 110, 40]),
            CellState::Empty => {
                let [v, _, _] = gray(0.6 + 0.4 * height.get(r, c));
                Rgb([v, v, v])
            }
        };
    }
    img
}

fn cover_chart(runs: &[RunReport]) -> RgbImage {
    let mut img = RgbImage::from_pixel(CHART_W, CHART_H, Rgb([255, 255, 255]));
    let plot_w = CHART_W - 2 * CHART_MARGIN;
    let plot_h = CHART_H - 2 * CHART_MARGIN;

    // Axes.
    for x in CHART_MARGIN..=CHART_MARGIN + plot_w {
        img.put_pixel(x, CHART_MARGIN + plot_h, Rgb([0, 0, 0]));
    }
    for y in CHART_MARGIN..=CHART_MARGIN + plot_h {
        img.put_pixel(CHART_MARGIN, y, Rgb([0, 0, 0]));
    }

    let max_t = runs
        .iter()
        .filter_map(|r| r.output.cover_series.last())
        .map(|s| s.iteration)
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let to_px = |t: u32, f: f64| -> (i64, i64) {
        let x = CHART_MARGIN as f64 + t as f64 / max_t * plot_w as f64;
        let y = CHART_MARGIN as f64 + (1.0 - f.clamp(0.0, 1.0)) * plot_h as f64;
        (x.round() as i64, y.round() as i64)
    };

    for run in runs {
        let color = model_color(run.model);
        for pair in run.output.cover_series.windows(2) {
            let (x0, y0) = to_px(pair[0].iteration, pair[0].fraction);
            let (x1, y1) = to_px(pair[1].iteration, pair[1].fraction);
            draw_line(&mut img, x0, y0, x1, y1, color);
        }
        if let [only] = run.output.cover_series.as_slice() {
            let (x, y) = to_px(only.iteration, only.fraction);
            draw_line(&mut img, x, y, x, y, color);
        }
    }
    img
}

/// Bresenham line, clipped to the image.
fn draw_line(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
    let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);
    loop {
        if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn save(img: &RgbImage, path: &Path) -> Result<()> {
    img.save(path).with_context(|| format!("failed to save {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let scale = args.scale.max(1);

    let report: ExperimentReport = serde_json::from_str(
        &fs::read_to_string(&args.input).with_context(|| format!("reading {}", args.input.display()))?,
    )
    .with_context(|| format!("parsing {}", args.input.display()))?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create {}", args.out_dir.display()))?;
    let land = &report.landscape;

    save(&field_image(&land.height, scale, terrain_color), &args.out_dir.join("height.png"))?;
    save(&field_image(&land.slope, scale, gray), &args.out_dir.join("slope.png"))?;
    save(&field_image(&land.growth, scale, growth_color), &args.out_dir.join("growth.png"))?;

    for run in &report.runs {
        for snap in &run.output.snapshots {
            let name = format!("{}_snapshot_{:05}.png", run.model, snap.iteration);
            save(&grid_image(&snap.grid, &land.height, scale), &args.out_dir.join(name))?;
        }
    }

    save(&cover_chart(&report.runs), &args.out_dir.join("cover.png"))?;
    println!("Done.");
    Ok(())
}
