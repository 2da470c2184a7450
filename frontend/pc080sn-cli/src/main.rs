use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use pc080sn_config::{Pc080snConfig, TilemapLayout, VRAM_LEN_WORDS};
use pc080sn_core::{Bank, COLOR_CONTROL_LEN, GFX_NIBBLE_ORDER, Pc080sn};
use std::fs;
use std::path::{Path, PathBuf};
use tilemap_common::{
    Bitmap16, Color, DrawMode, DrawTarget, LayerPriority, PriorityBitmap, TileGfx,
};

const CHIP_OPTIONS_HEADING: &str = "Chip Options";
const REGISTER_OPTIONS_HEADING: &str = "Register Options";
const OUTPUT_OPTIONS_HEADING: &str = "Output Options";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Layer {
    Bg,
    Fg,
}

impl From<Layer> for Bank {
    fn from(value: Layer) -> Self {
        match value {
            Layer::Bg => Self::Bg,
            Layer::Fg => Self::Fg,
        }
    }
}

#[derive(Parser)]
struct Args {
    /// Tile graphics ROM (packed 4bpp)
    #[arg(short = 'g', long)]
    gfx_rom: PathBuf,

    /// VRAM dump, 64KB of big-endian words
    #[arg(short = 'v', long)]
    vram: PathBuf,

    /// Output PNG path
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// TOML file with chip configuration; command-line options override it
    #[arg(long, help_heading = CHIP_OPTIONS_HEADING)]
    config: Option<PathBuf>,

    /// Tilemap layout
    #[arg(long, help_heading = CHIP_OPTIONS_HEADING)]
    layout: Option<TilemapLayout>,

    /// Horizontal alignment offset
    #[arg(long, allow_negative_numbers = true, help_heading = CHIP_OPTIONS_HEADING)]
    x_offset: Option<i32>,

    /// Vertical alignment offset
    #[arg(long, allow_negative_numbers = true, help_heading = CHIP_OPTIONS_HEADING)]
    y_offset: Option<i32>,

    /// Y scroll registers are wired inverted
    #[arg(long, default_value_t, help_heading = CHIP_OPTIONS_HEADING)]
    y_invert: bool,

    /// Disable road pixel recoloring in the road draw
    #[arg(long, default_value_t, help_heading = CHIP_OPTIONS_HEADING)]
    no_road_colors: bool,

    /// BG X scroll register (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_word, default_value = "0", help_heading = REGISTER_OPTIONS_HEADING)]
    bg_x_scroll: u16,

    /// BG Y scroll register
    #[arg(long, value_parser = parse_word, default_value = "0", help_heading = REGISTER_OPTIONS_HEADING)]
    bg_y_scroll: u16,

    /// FG X scroll register
    #[arg(long, value_parser = parse_word, default_value = "0", help_heading = REGISTER_OPTIONS_HEADING)]
    fg_x_scroll: u16,

    /// FG Y scroll register
    #[arg(long, value_parser = parse_word, default_value = "0", help_heading = REGISTER_OPTIONS_HEADING)]
    fg_y_scroll: u16,

    /// Control register
    #[arg(long, value_parser = parse_word, default_value = "0", help_heading = REGISTER_OPTIONS_HEADING)]
    control: u16,

    /// Palette RAM dump, big-endian xRGB-555 words; tiles are drawn in grayscale if not set
    #[arg(long, help_heading = OUTPUT_OPTIONS_HEADING)]
    palette: Option<PathBuf>,

    /// Road color control table, 256 big-endian words
    #[arg(long, help_heading = OUTPUT_OPTIONS_HEADING)]
    road_table: Option<PathBuf>,

    /// Layer to draw with the per-scanline road draw (requires --road-table)
    #[arg(long, requires = "road_table", help_heading = OUTPUT_OPTIONS_HEADING)]
    road_layer: Option<Layer>,

    /// Output width in pixels
    #[arg(long, default_value_t = 320, help_heading = OUTPUT_OPTIONS_HEADING)]
    width: u32,

    /// Output height in pixels
    #[arg(long, default_value_t = 224, help_heading = OUTPUT_OPTIONS_HEADING)]
    height: u32,

    /// Log the chip registers before drawing
    #[arg(long, default_value_t, help_heading = OUTPUT_OPTIONS_HEADING)]
    dump_registers: bool,
}

impl Args {
    fn chip_config(&self) -> anyhow::Result<Pc080snConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Unable to read config file '{}'", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Unable to parse config file '{}'", path.display()))?
            }
            None => Pc080snConfig::default(),
        };

        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(x_offset) = self.x_offset {
            config.x_offset = x_offset;
        }
        if let Some(y_offset) = self.y_offset {
            config.y_offset = y_offset;
        }
        config.y_invert |= self.y_invert;
        config.road_colors &= !self.no_road_colors;

        Ok(config)
    }
}

fn parse_word(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|err| format!("invalid 16-bit value '{s}': {err}"))
}

fn read_file(path: &Path, description: &str) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Unable to read {description} '{}'", path.display()))
}

fn read_be_words(path: &Path, description: &str) -> anyhow::Result<Vec<u16>> {
    let bytes = read_file(path, description)?;
    if bytes.len() % 2 != 0 {
        return Err(anyhow!("{description} '{}' has odd length {}", path.display(), bytes.len()));
    }

    Ok(bytes.chunks_exact(2).map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]])).collect())
}

fn xrgb555_to_color(word: u16) -> Color {
    let [r, g, b] = [10, 5, 0].map(|shift| {
        let component = ((word >> shift) & 0x1F) as u8;
        (component << 3) | (component >> 2)
    });
    Color::rgb(r, g, b)
}

fn to_rgba(bitmap: &Bitmap16, palette: Option<&[u16]>) -> Vec<Color> {
    bitmap
        .pixels()
        .iter()
        .map(|&pixel| match palette {
            Some(palette) => {
                palette.get(pixel as usize).copied().map_or(Color::BLACK, xrgb555_to_color)
            }
            None => {
                let shade = ((pixel & 0xF) as u8) * 17;
                Color::rgb(shade, shade, shade)
            }
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.chip_config()?;

    let gfx_rom = read_file(&args.gfx_rom, "gfx ROM")?;
    let gfx = TileGfx::decode_packed_4bpp(&gfx_rom, GFX_NIBBLE_ORDER)?;

    let vram = read_be_words(&args.vram, "VRAM dump")?;
    if vram.len() != VRAM_LEN_WORDS {
        log::warn!(
            "VRAM dump is {} words, expected {VRAM_LEN_WORDS}; truncating or zero-filling",
            vram.len()
        );
    }

    let mut chip = Pc080sn::new(config, gfx);
    for (offset, &word) in vram.iter().take(VRAM_LEN_WORDS).enumerate() {
        chip.write_vram(offset as u32, word, 0xFFFF);
    }

    chip.write_x_scroll(Bank::Bg, args.bg_x_scroll, 0xFFFF);
    chip.write_y_scroll(Bank::Bg, args.bg_y_scroll, 0xFFFF);
    chip.write_x_scroll(Bank::Fg, args.fg_x_scroll, 0xFFFF);
    chip.write_y_scroll(Bank::Fg, args.fg_y_scroll, 0xFFFF);
    chip.write_control(args.control, 0xFFFF);

    if args.dump_registers {
        chip.dump_registers(|name, fields| {
            log::info!("{name}");
            for (field, value) in fields {
                log::info!("  {field}: {value}");
            }
        });
    }

    let road_table = match &args.road_table {
        Some(path) => {
            let words = read_be_words(path, "road color table")?;
            let table: [u16; COLOR_CONTROL_LEN] =
                words.get(..COLOR_CONTROL_LEN).and_then(|words| words.try_into().ok()).ok_or_else(
                    || anyhow!("Road color table must have at least {COLOR_CONTROL_LEN} words"),
                )?;
            Some(table)
        }
        None => None,
    };

    let palette = args.palette.as_deref().map(|path| read_be_words(path, "palette")).transpose()?;

    chip.tilemap_update();

    let width = args.width as usize;
    let height = args.height as usize;
    let mut bitmap = Bitmap16::new(width, height);
    let mut priority = PriorityBitmap::new(width, height);
    let clip = bitmap.bounds();
    let mut target = DrawTarget { bitmap: &mut bitmap, priority: &mut priority, clip };

    for (bank, mode, layer_priority) in [
        (Bank::Bg, DrawMode::Opaque, LayerPriority::new(0x01, 0x00)),
        (Bank::Fg, DrawMode::Transparent, LayerPriority::new(0x02, 0xFF)),
    ] {
        match (args.road_layer, &road_table) {
            (Some(layer), Some(table)) if Bank::from(layer) == bank => {
                chip.draw_special(bank, &mut target, mode, layer_priority, table);
            }
            _ => chip.draw(bank, &mut target, mode, layer_priority),
        }
    }

    let colors = to_rgba(&bitmap, palette.as_deref());
    let image =
        image::RgbaImage::from_raw(args.width, args.height, bytemuck::cast_slice(&colors).to_vec())
            .ok_or_else(|| anyhow!("Image buffer does not match {}x{}", args.width, args.height))?;
    image
        .save(&args.output)
        .with_context(|| format!("Unable to write PNG to '{}'", args.output.display()))?;

    log::info!("Wrote {}x{} frame to '{}'", args.width, args.height, args.output.display());

    Ok(())
}
