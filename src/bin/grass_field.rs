//! Generate a grass field on a headless GPU, optionally check it against the
//! host kernel, and render one frame to a PNG.
//!
//! Usage:
//!   cargo run --release --bin grass_field -- [--config field.json] [--count N]
//!       [--seed S] [--shaded] [--height-map terrain.png | --fbm-terrain]
//!       [--displacement 8.0] [--verify] [--output grass.png] [--size 960x540]

use std::path::PathBuf;
use std::time::Instant;

use glam::{Vec2, Vec3};

use grassfield::core::{logging, Camera, Result};
use grassfield::grass::{
    generate_records, FieldConfig, FrameParams, GenerateOutcome, GrassField, HeightMap,
    KernelInputs, MeshData, RecordLayout, ReferenceMesh, TerrainSampler,
};
use grassfield::render::pipeline::GrassMaterial;
use grassfield::render::texture::{RenderTarget, COLOR_FORMAT, DEPTH_FORMAT};
use grassfield::render::GpuContext;

/// Positions within this distance count as matching the host kernel.
const VERIFY_TOLERANCE: f32 = 1e-3;

const DEFAULT_OUTPUT: &str = "grass_field.png";
const DEFAULT_DISPLACEMENT: f32 = 4.0;
const DEFAULT_SIZE: (u32, u32) = (960, 540);

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    count: Option<u32>,
    seed: Option<f32>,
    shaded: bool,
    height_map: Option<PathBuf>,
    fbm_terrain: bool,
    displacement: f32,
    verify: bool,
    output: PathBuf,
    size: (u32, u32),
}

fn parse_size(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> std::result::Result<String, String> {
    args.next().ok_or_else(|| format!("missing value for {}", flag))
}

fn parsed<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> std::result::Result<T, String> {
    let v = value(args, flag)?;
    v.parse().map_err(|_| format!("invalid {} value '{}'", flag, v))
}

fn parse_args() -> std::result::Result<Args, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from(args: impl IntoIterator<Item = String>) -> std::result::Result<Args, String> {
    let mut args = args.into_iter();

    let mut parsed_args = Args {
        config: None,
        count: None,
        seed: None,
        shaded: false,
        height_map: None,
        fbm_terrain: false,
        displacement: DEFAULT_DISPLACEMENT,
        verify: false,
        output: PathBuf::from(DEFAULT_OUTPUT),
        size: DEFAULT_SIZE,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed_args.config = Some(PathBuf::from(value(&mut args, "--config")?)),
            "--count" => parsed_args.count = Some(parsed(&mut args, "--count")?),
            "--seed" => parsed_args.seed = Some(parsed(&mut args, "--seed")?),
            "--shaded" => parsed_args.shaded = true,
            "--height-map" => {
                parsed_args.height_map = Some(PathBuf::from(value(&mut args, "--height-map")?));
            }
            "--fbm-terrain" => parsed_args.fbm_terrain = true,
            "--displacement" => parsed_args.displacement = parsed(&mut args, "--displacement")?,
            "--verify" => parsed_args.verify = true,
            "--output" => parsed_args.output = PathBuf::from(value(&mut args, "--output")?),
            "--size" => {
                let v = value(&mut args, "--size")?;
                parsed_args.size = parse_size(&v)
                    .filter(|&(w, h)| w > 0 && h > 0)
                    .ok_or_else(|| format!("invalid --size value '{}', expected WIDTHxHEIGHT", v))?;
            }
            "-h" | "--help" => return Err("show_help".to_string()),
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }

    Ok(parsed_args)
}

fn print_help() {
    println!("Grass Field Renderer");
    println!("====================");
    println!();
    println!("Usage: grass_field [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <FILE>        Field config JSON (default: built-in defaults)");
    println!("  --count <N>            Instance count override");
    println!("  --seed <S>             Seed override");
    println!("  --shaded               Write shaded records with a color bias");
    println!("  --height-map <PNG>     Displace blades with a height map image");
    println!("  --fbm-terrain          Displace blades with generated FBM terrain");
    println!("  --displacement <M>     Terrain displacement strength (default: 4.0)");
    println!("  --verify               Compare GPU placement with the host kernel");
    println!("  --output <PNG>         Output image (default: grass_field.png)");
    println!("  --size <WxH>           Output size (default: 960x540)");
}

fn main() {
    logging::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            if e == "show_help" {
                print_help();
                return;
            }
            log::error!("{}", e);
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => FieldConfig::load(path)?,
        None => FieldConfig::default(),
    };
    if let Some(count) = args.count {
        config.instance_count = count;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.shaded {
        config.layout = RecordLayout::Shaded;
    }
    config.validate()?;

    let height_map = match &args.height_map {
        Some(path) => Some(HeightMap::load(path)?),
        None if args.fbm_terrain => {
            Some(HeightMap::from_fbm(256, 256, config.seed.to_bits(), 64.0, 5))
        }
        None => None,
    };
    let displacement = args.displacement;
    let terrain = height_map.map(|height_map| {
        // Terrain spans the field with a little margin
        let extent = config.area_size * 1.2;
        TerrainSampler {
            height_map,
            displacement_strength: displacement,
            position: Vec3::new(
                config.origin.x - extent.x * 0.5,
                config.origin.y,
                config.origin.z - extent.y * 0.5,
            ),
            size: Vec3::new(extent.x, displacement, extent.y),
        }
    });

    let output = args.output.clone();
    let (width, height) = args.size;

    let ctx = pollster::block_on(GpuContext::headless())?;

    let mut field = GrassField::new(config.clone());
    field.set_material(Some(GrassMaterial::new(
        &ctx.device,
        COLOR_FORMAT,
        Some(DEPTH_FORMAT),
        config.layout,
    )));
    let blade = MeshData::blade(4, 0.08, 0.6);
    field.set_mesh(&ctx.queue, Some(ReferenceMesh::new(&ctx.device, &ctx.queue, &blade)?));
    field.set_terrain(terrain.clone());

    let start = Instant::now();
    let outcome = field.generate(&ctx.device, &ctx.queue)?;
    if let GenerateOutcome::Aborted(reason) = &outcome {
        log::error!("Generation aborted: {}", reason);
        return Ok(());
    }
    let records = field.read_back_records(&ctx.device, &ctx.queue)?;
    log::info!("Generated and read back {} records in {:.1}ms",
        records.len(), start.elapsed().as_secs_f64() * 1000.0);

    let mut max_error = None;
    if args.verify {
        let host = generate_records(&KernelInputs::from_config(&config, terrain.as_ref()));
        let error = host
            .iter()
            .zip(&records)
            .map(|(a, b)| (a.position - b.position).abs().max_element().max((a.scale - b.scale).abs()))
            .fold(0.0f32, f32::max);
        if error > VERIFY_TOLERANCE {
            log::warn!("GPU placement differs from host kernel by up to {}", error);
        } else {
            log::info!("GPU placement matches host kernel (max error {:e})", error);
        }
        max_error = Some(error);
    }

    // Three-quarter view over the field
    let target = RenderTarget::new(&ctx.device, width, height);
    let reach = config.area_size.max_element().max(1.0);
    let mut camera = Camera::look_at(
        config.origin + Vec3::new(0.0, reach * 0.35, reach * 0.75),
        config.origin,
        Vec3::Y,
    );
    camera.set_aspect(width as f32, height as f32);
    let frame = FrameParams {
        view_proj: camera.view_projection(),
        time: 0.0,
        wind: config.wind,
    };

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("grass_frame_encoder"),
    });
    let drawn = {
        let mut pass = target.begin_pass(&mut encoder, wgpu::Color { r: 0.55, g: 0.7, b: 0.9, a: 1.0 });
        field.render(&ctx.queue, &mut pass, &frame)
    };
    ctx.queue.submit(std::iter::once(encoder.finish()));
    target.read_image(&ctx.device, &ctx.queue)?.save(&output)?;
    log::info!("Wrote {} (field drawn: {})", output.display(), drawn);

    let args_words = field
        .read_back_args(&ctx.device, &ctx.queue)?
        .map(|a| a.to_words());
    let (min, max) = records.iter().fold(
        (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
        |(lo, hi), r| {
            let p = Vec2::new(r.position.x, r.position.z);
            (lo.min(p), hi.max(p))
        },
    );
    let bounds_xz = if records.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::json!({ "min": [min.x, min.y], "max": [max.x, max.y] })
    };
    let summary = serde_json::json!({
        "instance_count": field.instance_count(),
        "layout": config.layout,
        "seed": config.seed,
        "draw_args": args_words,
        "bounds_xz": bounds_xz,
        "terrain": terrain.is_some(),
        "max_host_error": max_error,
        "image": output.display().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Args, String> {
        parse_args_from(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert!(args.count.is_none());
        assert_eq!(args.displacement, DEFAULT_DISPLACEMENT);
        assert_eq!(args.size, (960, 540));
        assert_eq!(args.output, PathBuf::from("grass_field.png"));
    }

    #[test]
    fn test_overrides() {
        let args = parse(&["--count", "500", "--seed", "2.5", "--shaded", "--size", "320x200", "--verify"]).unwrap();
        assert_eq!(args.count, Some(500));
        assert_eq!(args.seed, Some(2.5));
        assert!(args.shaded);
        assert!(args.verify);
        assert_eq!(args.size, (320, 200));
    }

    #[test]
    fn test_rejects_malformed_numbers() {
        let err = parse(&["--count", "x"]).unwrap_err();
        assert!(err.contains("--count"), "{}", err);
        assert!(parse(&["--count", "-5"]).is_err());
        assert!(parse(&["--seed", "abc"]).is_err());
        assert!(parse(&["--displacement", "high"]).is_err());
        assert!(parse(&["--size", "960"]).is_err());
        assert!(parse(&["--size", "0x540"]).is_err());
    }

    #[test]
    fn test_rejects_missing_value_and_unknown_flag() {
        assert!(parse(&["--count"]).unwrap_err().contains("missing"));
        assert!(parse(&["--output"]).is_err());
        assert!(parse(&["--cuont", "5"]).unwrap_err().contains("unknown"));
    }
}
