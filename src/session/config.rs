use crate::assets::loader::LoaderOpts;
use crate::render::renderer::RenderOpts;

/// Environment variable overriding [`crate::geometry::warp::WarpOpts::grid`].
pub const ENV_WARP_GRID: &str = "MOCKUP_WARP_GRID";
/// Environment variable overriding [`RenderOpts::preserve_drawing_buffer`].
pub const ENV_PRESERVE_BUFFER: &str = "MOCKUP_PRESERVE_BUFFER";

/// Everything a [`crate::session::mockup_session::MockupSession`] is configured with.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionOpts {
    /// Renderer options.
    pub render: RenderOpts,
    /// Texture loader options.
    pub loader: LoaderOpts,
}

impl SessionOpts {
    /// Defaults with `MOCKUP_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`. Unparseable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(grid) = lookup(ENV_WARP_GRID)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
        {
            self.render.warp.grid = grid;
        }
        if let Some(preserve) = lookup(ENV_PRESERVE_BUFFER).and_then(|v| parse_flag(&v)) {
            self.render.preserve_drawing_buffer = preserve;
        }
        self
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;
