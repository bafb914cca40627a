use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use room_restyle::codec::decode_image;
use room_restyle::config::{AppConfig, ConfigManager, DirStore, EXPORT_FILE_NAME};
use room_restyle::crop::{
    CropOptions, CropRect, CropRegion, DEFAULT_CONTEXT_EXPANSION, DEFAULT_OUTPUT_WIDTH,
};
use room_restyle::mask::{DEFAULT_SATURATION_PASSES, NormalizeOptions, normalize_stroke_buffer};
use room_restyle::palette::{DEFAULT_PALETTE_SIZE, extract_palette_encoded};
use room_restyle::project::{ProjectFile, is_project_path};
use room_restyle::tile::{DEFAULT_TILE_CANVAS, TileOptions};
use room_restyle::{NormalizedMask, RestyleError, composite_encoded, crop_encoded, tile_encoded};

const EXIT_USAGE: u8 = 1;
const EXIT_PROCESSING: u8 = 2;

/// Image tools behind AI interior restyling.
#[derive(Parser, Debug)]
#[command(
    name = "room-restyle",
    about = "Inpainting masks, detail crops, texture tiling and mask-enforced compositing"
)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a painted stroke layer into a binary mask
    Mask {
        strokes: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Saturation passes applied before thresholding
        #[arg(long, default_value_t = DEFAULT_SATURATION_PASSES)]
        passes: u32,
    },

    /// Crop a region (in percent) with surrounding context
    Crop {
        image: PathBuf,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
        /// Growth per side as a fraction of the region size
        #[arg(long, default_value_t = DEFAULT_CONTEXT_EXPANSION)]
        expand: f64,
        #[arg(long, default_value_t = DEFAULT_OUTPUT_WIDTH)]
        output_width: u32,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Repeat a texture on a count × count grid
    Tile {
        texture: PathBuf,
        #[arg(long)]
        count: u32,
        #[arg(long, default_value_t = DEFAULT_TILE_CANVAS)]
        size: u32,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the dominant colours of an image as hex codes
    Palette {
        image: PathBuf,
        #[arg(long, default_value_t = DEFAULT_PALETTE_SIZE)]
        count: usize,
    },

    /// Keep the generated image only where the mask is white
    Composite {
        original: PathBuf,
        generated: PathBuf,
        mask: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Manage the style and material catalog
    Config {
        #[command(subcommand)]
        action: ConfigAction,
        /// Directory holding the saved configuration
        #[arg(long, global = true, default_value = ".room-restyle")]
        dir: PathBuf,
    },

    /// Summarize a saved project
    Project { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration as JSON
    Show,
    /// Write the active configuration to a file
    Export { path: Option<PathBuf> },
    /// Validate a configuration file and make it active
    Import { path: PathBuf },
    /// Discard the saved configuration
    Reset,
}

fn main() -> ExitCode {
    // clap's own exit code for usage errors collides with EXIT_PROCESSING
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_PROCESSING)
        }
    }
}

fn run(command: Command) -> room_restyle::Result<()> {
    match command {
        Command::Mask {
            strokes,
            output,
            passes,
        } => {
            let layer = decode_image(&fs::read(&strokes)?)?.to_rgba8();
            let options = NormalizeOptions {
                saturation_passes: passes,
                ..Default::default()
            };
            let mask = normalize_stroke_buffer(&layer, &options)
                .ok_or_else(|| RestyleError::EmptyMask(strokes.display().to_string()))?;
            fs::write(&output, mask.to_png()?)?;
            info!(
                "mask written to {} ({} editable pixels)",
                output.display(),
                mask.editable_count()
            );
        }
        Command::Crop {
            image,
            x,
            y,
            width,
            height,
            expand,
            output_width,
            output,
        } => {
            let region = CropRegion::new(CropRect::new(x, y, width, height), expand);
            let options = CropOptions {
                output_width,
                ..Default::default()
            };
            fs::write(&output, crop_encoded(&fs::read(&image)?, &region, &options)?)?;
            info!("crop written to {}", output.display());
        }
        Command::Tile {
            texture,
            count,
            size,
            output,
        } => {
            let options = TileOptions {
                size,
                ..Default::default()
            };
            fs::write(&output, tile_encoded(&fs::read(&texture)?, count, &options)?)?;
            info!("tiled texture written to {}", output.display());
        }
        Command::Palette { image, count } => {
            for colour in extract_palette_encoded(&fs::read(&image)?, count)? {
                println!("{}", colour);
            }
        }
        Command::Composite {
            original,
            generated,
            mask,
            output,
        } => {
            let mask = NormalizedMask::from_image(&decode_image(&fs::read(&mask)?)?)
                .ok_or_else(|| RestyleError::EmptyMask(mask.display().to_string()))?;
            let merged = composite_encoded(&fs::read(&original)?, &fs::read(&generated)?, &mask);
            fs::write(&output, merged)?;
            info!("composite written to {}", output.display());
        }
        Command::Config { action, dir } => run_config(action, &dir)?,
        Command::Project { file } => print_project(&file)?,
    }
    Ok(())
}

fn run_config(action: ConfigAction, dir: &Path) -> room_restyle::Result<()> {
    let mut manager = ConfigManager::new(DirStore::new(dir))?;
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&manager.load())?);
        }
        ConfigAction::Export { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
            manager.export_to_file(&manager.load(), &path)?;
            println!("Exported configuration to '{}'", path.display());
        }
        ConfigAction::Import { path } => {
            let config = manager.import_from_file(&path)?;
            print_catalog_summary(&config);
        }
        ConfigAction::Reset => {
            let config = manager.reset()?;
            print_catalog_summary(&config);
        }
    }
    Ok(())
}

fn print_catalog_summary(config: &AppConfig) {
    println!(
        "{} styles, {} shooting styles, {} materials",
        config.styles.len(),
        config.shooting_styles.len(),
        config.materials.len()
    );
}

fn print_project(path: &Path) -> room_restyle::Result<()> {
    if !is_project_path(path) {
        return Err(RestyleError::InvalidProject(format!(
            "'{}' is not a .gphm file",
            path.display()
        )));
    }

    let project = ProjectFile::load(path)?;
    let original = project.original_image()?;
    println!("Project:         {}", project.original_file_name);
    println!("Version:         {}", project.version);
    println!("Original image:  {} ({} bytes)", original.mime, original.bytes.len());
    println!(
        "Generated image: {}",
        if project.generated_image.is_some() { "yes" } else { "no" }
    );
    println!(
        "Style:           {} / {} ({})",
        project.config.style, project.config.shooting_style, project.config.ratio
    );
    println!("Detected items:  {}", project.detected_items.len());
    println!("Added items:     {}", project.added_items.len());
    println!("Detail shots:    {}", project.detail_points.len());
    Ok(())
}
