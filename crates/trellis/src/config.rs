//! Layout configuration.
//!
//! [`LayoutConfig`] carries every tunable of the engine. It deserializes from
//! TOML with every field optional, down to the individual sides of
//! `[container_padding]`:
//!
//! ```toml
//! direction = "top-to-bottom"
//! layer_gap = 120.0
//! node_gap = 60.0
//! ordering_sweeps = 12
//!
//! [default_node_size]
//! width = 240.0
//! height = 90.0
//!
//! [container_padding]
//! top = 65.0
//! right = 16.0
//! bottom = 20.0
//! left = 16.0
//! ```

use std::{fs, path::Path};

use log::{info, warn};
use serde::{Deserialize, Deserializer};

use trellis_core::geometry::{Insets, Size};

use crate::error::TrellisError;

/// Smallest allowed spacing between adjacent layers, edge to edge.
pub const MIN_LAYER_GAP: f32 = 80.0;

/// Smallest allowed spacing between neighbours within one layer, edge to edge.
pub const MIN_NODE_GAP: f32 = 60.0;

const DEFAULT_CONTAINER_PADDING: Insets = Insets::new(65.0, 16.0, 20.0, 16.0);

/// Main flow direction of the layered drawing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Layers advance along x; nodes within a layer stack along y.
    #[default]
    LeftToRight,

    /// Layers advance along y; nodes within a layer stack along x.
    TopToBottom,
}

/// Tunables of the layout engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    direction: Direction,
    layer_gap: f32,
    node_gap: f32,
    default_node_size: Size,
    #[serde(deserialize_with = "deserialize_padding")]
    container_padding: Insets,
    ordering_sweeps: usize,
    alignment_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            layer_gap: MIN_LAYER_GAP,
            node_gap: MIN_NODE_GAP,
            default_node_size: Size::new(240.0, 90.0),
            container_padding: DEFAULT_CONTAINER_PADDING,
            ordering_sweeps: 8,
            alignment_passes: 4,
        }
    }
}

impl LayoutConfig {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Config`] if the text is not valid TOML or does not
    /// match the configuration schema.
    pub fn from_toml_str(content: &str) -> Result<Self, TrellisError> {
        let config: LayoutConfig =
            toml::from_str(content).map_err(|err| TrellisError::Config(err.to_string()))?;
        Ok(config.validated())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn layer_gap(&self) -> f32 {
        self.layer_gap
    }

    pub fn node_gap(&self) -> f32 {
        self.node_gap
    }

    /// Size used for nodes the editor has not measured yet.
    pub fn default_node_size(&self) -> Size {
        self.default_node_size
    }

    /// Padding between a container's frame and its nested content.
    pub fn container_padding(&self) -> Insets {
        self.container_padding
    }

    /// Number of barycenter sweeps spent on crossing minimization.
    pub fn ordering_sweeps(&self) -> usize {
        self.ordering_sweeps
    }

    /// Number of median passes spent on straightening edges.
    pub fn alignment_passes(&self) -> usize {
        self.alignment_passes
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_layer_gap(mut self, gap: f32) -> Self {
        self.layer_gap = gap;
        self
    }

    pub fn with_node_gap(mut self, gap: f32) -> Self {
        self.node_gap = gap;
        self
    }

    pub fn with_default_node_size(mut self, size: Size) -> Self {
        self.default_node_size = size;
        self
    }

    pub fn with_container_padding(mut self, padding: Insets) -> Self {
        self.container_padding = padding;
        self
    }

    pub fn with_ordering_sweeps(mut self, sweeps: usize) -> Self {
        self.ordering_sweeps = sweeps;
        self
    }

    pub fn with_alignment_passes(mut self, passes: usize) -> Self {
        self.alignment_passes = passes;
        self
    }

    /// Repairs values the engine cannot honour.
    ///
    /// Gaps that are not finite or below their minimum are set to the minimum.
    /// Unusable default sizes and paddings fall back to the built-in defaults.
    /// Every repair is logged.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if !self.layer_gap.is_finite() || self.layer_gap < MIN_LAYER_GAP {
            warn!(
                layer_gap = self.layer_gap,
                minimum = MIN_LAYER_GAP;
                "Unusable layer gap, using the minimum"
            );
            self.layer_gap = MIN_LAYER_GAP;
        }
        if !self.node_gap.is_finite() || self.node_gap < MIN_NODE_GAP {
            warn!(
                node_gap = self.node_gap,
                minimum = MIN_NODE_GAP;
                "Unusable node gap, using the minimum"
            );
            self.node_gap = MIN_NODE_GAP;
        }
        if !self.default_node_size.is_usable() || self.default_node_size.is_zero() {
            warn!(
                size:? = self.default_node_size;
                "Unusable default node size, using built-in default"
            );
            self.default_node_size = defaults.default_node_size;
        }

        let padding = self.container_padding;
        let sides = [padding.top(), padding.right(), padding.bottom(), padding.left()];
        if sides.iter().any(|side| !side.is_finite() || *side < 0.0) {
            warn!(padding:? = padding; "Unusable container padding, using built-in default");
            self.container_padding = defaults.container_padding;
        }

        self
    }
}

/// `[container_padding]` as written in TOML, where every side is optional.
#[derive(Deserialize)]
struct PaddingSides {
    top: Option<f32>,
    right: Option<f32>,
    bottom: Option<f32>,
    left: Option<f32>,
}

fn deserialize_padding<'de, D>(deserializer: D) -> Result<Insets, D::Error>
where
    D: Deserializer<'de>,
{
    let sides = PaddingSides::deserialize(deserializer)?;
    let defaults = DEFAULT_CONTAINER_PADDING;
    Ok(Insets::new(
        sides.top.unwrap_or(defaults.top()),
        sides.right.unwrap_or(defaults.right()),
        sides.bottom.unwrap_or(defaults.bottom()),
        sides.left.unwrap_or(defaults.left()),
    ))
}

/// Loads and validates a layout configuration from a TOML file.
///
/// # Errors
///
/// Returns [`TrellisError::Io`] if the file cannot be read and
/// [`TrellisError::Config`] if its content cannot be parsed.
pub fn load_config(path: impl AsRef<Path>) -> Result<LayoutConfig, TrellisError> {
    let path = path.as_ref();
    info!(path = path.display().to_string(); "Loading layout configuration");

    let content = fs::read_to_string(path)?;
    LayoutConfig::from_toml_str(&content)
}
