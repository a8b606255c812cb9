//! Building NPC skins from a texture image and a geometry model.
//!
//! A [`Model`] is read from the JSON geometry format used by the game client and
//! declares the texture dimensions it was made for. A [`Texture`] is decoded
//! from an image file, PNG being always supported. [`skin`] combines the two
//! after checking that their dimensions agree.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde::Deserialize;
use thiserror::Error;

use npc_shared::{ModelConfig, Skin};

/// Texture dimensions accepted by the client
const SUPPORTED_DIMENSIONS: [(u32, u32); 3] = [(64, 32), (64, 64), (128, 128)];

/// Model of a custom skin with a 64x64 texture
pub static DEFAULT_MODEL: LazyLock<Model> = LazyLock::new(|| {
    read_model(&include_bytes!("default_model.json")[..])
        .unwrap_or_else(|e| panic!("embedded default skin model is invalid: {}", e))
});

#[derive(Debug, Error)]
pub enum SkinError {
    #[error("failed opening {kind} file {}: {source}", path.display())]
    Io {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed reading skin data: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed decoding texture: {0}")]
    Decode(#[from] image::ImageError),

    #[error("malformed skin model: {0}")]
    MalformedModel(String),

    #[error("invalid skin texture dimensions: {width}x{height}")]
    UnsupportedDimensions { width: u32, height: u32 },

    #[error("skin texture dimensions did not match those specified in model: {model} specified but got {texture}")]
    DimensionMismatch { model: Dimensions, texture: Dimensions },
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Geometry of a skin, parsed with [`read_model`] or [`parse_model`]
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    json: Vec<u8>,
    config: ModelConfig,
    dimensions: Dimensions,
}

impl Model {
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Texture dimensions the model was made for
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

/// Pixels of a skin, parsed with [`read_texture`] or [`parse_texture`]
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pix: Vec<u8>,
    dimensions: Dimensions,
}

impl Texture {
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

#[derive(Deserialize)]
struct GeometryFile {
    #[serde(rename = "minecraft:geometry")]
    geometry: Vec<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    description: Description,
}

#[derive(Deserialize)]
struct Description {
    identifier: String,
    texture_width: f64,
    texture_height: f64,
}

/// Read a JSON geometry model. The identifier of the first geometry becomes
/// the default geometry of the skin.
pub fn read_model(mut r: impl Read) -> Result<Model, SkinError> {
    let mut json = Vec::new();
    r.read_to_end(&mut json)?;

    let file: GeometryFile =
        serde_json::from_slice(&json).map_err(|e| SkinError::MalformedModel(e.to_string()))?;
    let Some(geometry) = file.geometry.into_iter().next() else {
        return Err(SkinError::MalformedModel("model contains no geometry".into()));
    };
    let desc = geometry.description;

    let dimensions = Dimensions {
        width: texture_dimension("texture_width", desc.texture_width)?,
        height: texture_dimension("texture_height", desc.texture_height)?,
    };
    let config = ModelConfig {
        default: desc.identifier,
        ..Default::default()
    };
    Ok(Model { json, config, dimensions })
}

fn texture_dimension(field: &str, value: f64) -> Result<u32, SkinError> {
    if value.fract() != 0.0 || value <= 0.0 || value > u32::MAX as f64 {
        return Err(SkinError::MalformedModel(format!("{} must be a positive integer, got {}", field, value)));
    }
    Ok(value as u32)
}

/// Decode a skin texture into RGBA pixels, 4 bytes per pixel. Alpha is kept
/// straight, colour channels are not premultiplied.
pub fn read_texture(mut r: impl Read) -> Result<Texture, SkinError> {
    let mut data = Vec::new();
    r.read_to_end(&mut data)?;

    let img = image::load_from_memory(&data)?.to_rgba8();
    let (width, height) = img.dimensions();
    if !SUPPORTED_DIMENSIONS.contains(&(width, height)) {
        return Err(SkinError::UnsupportedDimensions { width, height });
    }

    Ok(Texture {
        pix: img.into_raw(),
        dimensions: Dimensions { width, height },
    })
}

pub fn parse_model(path: impl AsRef<Path>) -> Result<Model, SkinError> {
    read_model(open("model", path.as_ref())?)
}

pub fn parse_texture(path: impl AsRef<Path>) -> Result<Texture, SkinError> {
    read_texture(open("texture", path.as_ref())?)
}

fn open(kind: &'static str, path: &Path) -> Result<File, SkinError> {
    File::open(path).map_err(|source| SkinError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

/// Combine a texture and a model into a skin. Fails if the texture does not
/// have the dimensions the model declares.
pub fn skin(texture: &Texture, model: &Model) -> Result<Skin, SkinError> {
    if texture.dimensions != model.dimensions {
        return Err(SkinError::DimensionMismatch {
            model: model.dimensions,
            texture: texture.dimensions,
        });
    }

    let mut s = Skin::new(texture.dimensions.width, texture.dimensions.height);
    s.pix = texture.pix.clone();
    s.model = model.json.clone();
    s.model_config = model.config.clone();
    Ok(s)
}

/// Like [`skin`], panicking on mismatched dimensions
pub fn must_skin(texture: &Texture, model: &Model) -> Skin {
    skin(texture, model).unwrap_or_else(|e| panic!("{}", e))
}

pub fn must_parse_model(path: impl AsRef<Path>) -> Model {
    parse_model(path).unwrap_or_else(|e| panic!("{}", e))
}

pub fn must_parse_texture(path: impl AsRef<Path>) -> Texture {
    parse_texture(path).unwrap_or_else(|e| panic!("{}", e))
}

/// Build a skin from a texture file, panicking on any error
pub fn must_skin_from_path(path: impl AsRef<Path>, model: &Model) -> Skin {
    must_skin(&must_parse_texture(path), model)
}

/// Transparent skin using [`DEFAULT_MODEL`]
pub fn default_skin() -> Skin {
    let model = &*DEFAULT_MODEL;
    let Dimensions { width, height } = model.dimensions;

    let mut s = Skin::new(width, height);
    s.model = model.json.clone();
    s.model_config = model.config.clone();
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0x80, 0xff]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn model_json(width: u32, height: u32) -> String {
        format!(
            r#"{{
                "format_version": "1.8.0",
                "minecraft:geometry": [{{
                    "description": {{
                        "identifier": "geometry.test",
                        "texture_width": {width},
                        "texture_height": {height}
                    }},
                    "bones": []
                }}]
            }}"#
        )
    }

    #[test]
    fn test_default_model() {
        assert_eq!(DEFAULT_MODEL.config().default, "geometry.humanoid.custom");
        assert_eq!(DEFAULT_MODEL.dimensions(), Dimensions { width: 64, height: 64 });

        let s = default_skin();
        assert_eq!((s.width(), s.height()), (64, 64));
        assert_eq!(s.pix.len(), 64 * 64 * 4);
        assert!(!s.model.is_empty());
    }

    #[test]
    fn test_skin_from_texture_and_model() {
        let texture = read_texture(&png(64, 32)[..]).unwrap();
        let model = read_model(model_json(64, 32).as_bytes()).unwrap();

        let s = skin(&texture, &model).unwrap();
        assert_eq!((s.width(), s.height()), (64, 32));
        assert_eq!(s.pix.len(), 64 * 32 * 4);
        // Pixel (3, 2) in RGBA order
        let i = (2 * 64 + 3) * 4;
        assert_eq!(&s.pix[i..i + 4], &[3, 2, 0x80, 0xff]);
        assert_eq!(s.model_config.default, "geometry.test");
        assert_eq!(s.model, model_json(64, 32).into_bytes());
    }

    #[test]
    fn test_dimension_mismatch_reports_both() {
        let texture = read_texture(&png(64, 64)[..]).unwrap();
        let model = read_model(model_json(64, 32).as_bytes()).unwrap();

        let err = skin(&texture, &model).unwrap_err();
        match &err {
            SkinError::DimensionMismatch { model, texture } => {
                assert_eq!(*model, Dimensions { width: 64, height: 32 });
                assert_eq!(*texture, Dimensions { width: 64, height: 64 });
            }
            other => panic!("unexpected error: {other}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("64x32") && msg.contains("64x64"), "{msg}");
    }

    #[test]
    fn test_unsupported_texture_dimensions() {
        let err = read_texture(&png(100, 100)[..]).unwrap_err();
        assert!(matches!(err, SkinError::UnsupportedDimensions { width: 100, height: 100 }));

        for (w, h) in SUPPORTED_DIMENSIONS {
            assert!(read_texture(&png(w, h)[..]).is_ok(), "{w}x{h} should be accepted");
        }
    }

    #[test]
    fn test_malformed_models() {
        for json in [
            "not json",
            r#"{"format_version": "1.8.0"}"#,
            r#"{"minecraft:geometry": []}"#,
            r#"{"minecraft:geometry": [{"description": {"identifier": "x", "texture_width": "64", "texture_height": 64}}]}"#,
            r#"{"minecraft:geometry": [{"description": {"identifier": "x", "texture_width": -64, "texture_height": 64}}]}"#,
            r#"{"minecraft:geometry": [{"description": {"identifier": "x", "texture_width": 64.5, "texture_height": 64}}]}"#,
            r#"{"minecraft:geometry": [{"description": {"identifier": "x", "texture_width": 64, "texture_height": 0}}]}"#,
        ] {
            let err = read_model(json.as_bytes()).unwrap_err();
            assert!(matches!(err, SkinError::MalformedModel(_)), "{json}: {err}");
        }
    }

    #[test]
    fn test_texture_alpha_is_straight() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([200, 100, 50, 128]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();

        let texture = read_texture(&out.into_inner()[..]).unwrap();
        assert_eq!(&texture.pix[..4], &[200, 100, 50, 128]);
    }

    #[test]
    fn test_undecodable_texture() {
        let err = read_texture(&b"definitely not a png"[..]).unwrap_err();
        assert!(matches!(err, SkinError::Decode(_)));
    }

    #[test]
    fn test_parse_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let texture_path = dir.path().join("skin.png");
        let model_path = dir.path().join("geometry.json");
        std::fs::write(&texture_path, png(128, 128)).unwrap();
        std::fs::write(&model_path, model_json(128, 128)).unwrap();

        let model = must_parse_model(&model_path);
        let s = must_skin_from_path(&texture_path, &model);
        assert_eq!((s.width(), s.height()), (128, 128));

        let err = parse_texture(dir.path().join("missing.png")).unwrap_err();
        match err {
            SkinError::Io { kind, path, .. } => {
                assert_eq!(kind, "texture");
                assert!(path.ends_with("missing.png"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[should_panic(expected = "did not match")]
    fn test_must_skin_panics_on_mismatch() {
        let texture = read_texture(&png(128, 128)[..]).unwrap();
        must_skin(&texture, &DEFAULT_MODEL);
    }
}
