//! The resize contract: requested width, derived height, output format.

use crate::errors::{GatewayError, GatewayResult};
use std::{fmt, str::FromStr};

/// Container format every response is transcoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Webp,
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "image/webp",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    #[cfg(test)]
    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Webp => image::ImageFormat::WebP,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Png => image::ImageFormat::Png,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(OutputFormat::Webp),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("unsupported output format `{}`", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        };
        f.write_str(name)
    }
}

/// Requested output width for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    pub target_width: u32,
}

impl ResizeSpec {
    /// Parse the `w` query value.
    ///
    /// Absent or empty means `default_width`. Anything else must be a
    /// positive integer: `0`, `-5` and `abc` are all rejected.
    pub fn from_query(width: Option<&str>, default_width: u32) -> GatewayResult<Self> {
        let raw = match width.map(str::trim) {
            None | Some("") => {
                return Ok(Self {
                    target_width: default_width,
                });
            }
            Some(raw) => raw,
        };
        match raw.parse::<u32>() {
            Ok(0) => Err(GatewayError::BadRequest(
                "cannot convert w: width must be positive".into(),
            )),
            Ok(target_width) => Ok(Self { target_width }),
            Err(err) => Err(GatewayError::BadRequest(format!(
                "cannot convert w `{}`: {}",
                raw, err
            ))),
        }
    }
}

/// Height that keeps the source aspect ratio at `target_width`.
pub fn proportional_height(target_width: u32, width: u32, height: u32) -> u32 {
    let ratio = f64::from(height) / f64::from(width);
    (f64::from(target_width) * ratio).round() as u32
}
