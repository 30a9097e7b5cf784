use std::fs::File;
use std::io::{BufWriter, Write};
use std::{env, fs};

use anyhow::{bail, Context, Result};
use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use pathtracing_engine::renderer::Renderer;
use pathtracing_engine::scene_file::parse_scene_file;

/// Frames rendered when the scene sets no sample budget.
const UNBOUNDED_FRAMES: u32 = 64;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: {} <scene-file> <out.ppm> [png-stem]", args[0]);
    }
    let content =
        fs::read_to_string(&args[1]).with_context(|| format!("failed opening {}", args[1]))?;
    let description = parse_scene_file(&content).with_context(|| format!("in {}", args[1]))?;

    let mut renderer = Renderer::new(
        description.settings.clone(),
        description.filter_settings.clone(),
    );
    renderer.on_resize(description.width, description.height)?;

    let frames = match renderer.settings().max_samples {
        0 => UNBOUNDED_FRAMES,
        n => n,
    };
    let progress = ProgressBar::new(frames as u64);
    progress.set_style(ProgressStyle::with_template(
        "{elapsed_precise} [{bar:40}] {pos}/{len} samples",
    )?);
    for _ in 0..frames {
        renderer.render(&description.scene, &description.camera)?;
        progress.inc(1);
    }
    // The sample budget is spent now, so this call only runs the filter pipeline.
    renderer.render(&description.scene, &description.camera)?;
    progress.finish();

    let stats = renderer.statistics();
    log::info!(
        "{} samples, avg {:.3}ms per frame ({:.1} fps), denoise {:.3}ms",
        stats.frame_index,
        stats.average_render_ms,
        stats.fps,
        stats.denoise_ms
    );

    let image = renderer
        .to_rgba_image()
        .context("renderer produced no image")?;
    dump_rendered_to_ppm(&image, &args[2])?;
    if let Some(stem) = args.get(3) {
        let png_path = format!("{stem}.png");
        image
            .save_with_format(&png_path, ImageFormat::Png)
            .with_context(|| format!("failed writing {png_path}"))?;
    }
    Ok(())
}

fn dump_rendered_to_ppm(image: &image::RgbaImage, path: &str) -> Result<()> {
    let mut out = BufWriter::new(File::create(path).with_context(|| format!("failed creating {path}"))?);
    write!(out, "P6\n{} {}\n255\n", image.width(), image.height())?;
    for pixel in image.pixels() {
        out.write_all(&pixel.0[..3])?;
    }
    out.flush()?;
    Ok(())
}
