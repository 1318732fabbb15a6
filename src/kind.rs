//! Mark kinds and their declarative descriptors.
//!
//! Every shape variant shares one [`crate::mark::Mark`] type and one
//! [`crate::manager::MarkManager`] state machine. What differs per kind is
//! captured here: the ordered anchor schema, how many anchors the user places
//! by clicking, whether a width-adjust phase follows, and which derived scalar
//! parameter (if any) the kind carries. Geometry lives in [`crate::shape`].

#[cfg(test)]
#[path = "kind_test.rs"]
mod kind_test;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_DEVIATION, MIN_CHANNEL_HEIGHT, MIN_DEVIATION};

/// Name of one anchor within a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorName {
    Start,
    End,
    Control,
    Center,
    Radius,
    Angle,
    Handle,
    BaseStart,
    BaseEnd,
    Apex,
    Projection,
    Entry,
    P0,
    P1,
    P2,
    P3,
    P4,
    P5,
}

impl AnchorName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Control => "control",
            Self::Center => "center",
            Self::Radius => "radius",
            Self::Angle => "angle",
            Self::Handle => "handle",
            Self::BaseStart => "baseStart",
            Self::BaseEnd => "baseEnd",
            Self::Apex => "apex",
            Self::Projection => "projection",
            Self::Entry => "entry",
            Self::P0 => "p0",
            Self::P1 => "p1",
            Self::P2 => "p2",
            Self::P3 => "p3",
            Self::P4 => "p4",
            Self::P5 => "p5",
        }
    }
}

/// A derived scalar carried by a mark in addition to its anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamKind {
    /// Distance from the centre line to each parallel line, in price units.
    ChannelHeight,
    /// Standard-deviation multiplier of a regression channel's bands.
    Deviation,
}

impl ParamKind {
    /// Value a freshly created mark starts with.
    #[must_use]
    pub fn initial_value(self) -> f64 {
        match self {
            Self::ChannelHeight => 0.0,
            Self::Deviation => DEFAULT_DEVIATION,
        }
    }

    /// Clamp `value` into the parameter's valid range.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        match self {
            Self::ChannelHeight => value.abs().max(MIN_CHANNEL_HEIGHT),
            Self::Deviation => value.max(MIN_DEVIATION),
        }
    }
}

/// Shape variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkKind {
    LineSegment,
    ArrowLine,
    ThickArrowLine,
    Ray,
    ExtendedLine,
    HorizontalLine,
    VerticalLine,
    ParallelChannel,
    EquidistantChannel,
    DisjointChannel,
    LinearRegressionChannel,
    AndrewPitchfork,
    EnhancedAndrewPitchfork,
    SchiffPitchfork,
    Rectangle,
    Circle,
    Ellipse,
    Triangle,
    Sector,
    Curve,
    DoubleCurve,
    GannFan,
    GannBox,
    GannRectangle,
    FibonacciRetracement,
    FibonacciExtension,
    FibonacciExtensionBaseTime,
    FibonacciTimeZone,
    FibonacciFan,
    FibonacciArc,
    FibonacciCircle,
    FibonacciSpiral,
    FibonacciWedge,
    FibonacciChannel,
    PriceRange,
    TimeRange,
    TimePriceRange,
    LongPosition,
    ShortPosition,
    Abcd,
    TriangleAbcd,
    Xabcd,
    ElliottImpulse,
    ElliottCorrection,
    ElliottTriangle,
    ElliottDoubleCombination,
    ElliottTripleCombination,
    Text,
    Emoji,
}

/// Unrecognized mark kind name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown mark kind: {0}")]
pub struct ParseKindError(pub String);

/// Per-kind placement and anchor schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSpec {
    /// Anchor names in declaration order.
    pub anchors: &'static [AnchorName],
    /// Number of leading anchors placed by clicks; the rest are derived.
    pub clicks: usize,
    /// Whether a width-adjust click follows the last anchor click.
    pub width_adjust: bool,
    /// Derived scalar parameter, if any.
    pub param: Option<ParamKind>,
}

const TWO_POINT: &[AnchorName] = &[AnchorName::Start, AnchorName::End];
const ONE_POINT: &[AnchorName] = &[AnchorName::Start];
const FORK: &[AnchorName] = &[AnchorName::Handle, AnchorName::BaseStart, AnchorName::BaseEnd];
const RADIAL: &[AnchorName] = &[AnchorName::Center, AnchorName::Radius];
const SECTOR: &[AnchorName] = &[AnchorName::Center, AnchorName::Radius, AnchorName::Angle];
const TRIANGLE: &[AnchorName] = &[AnchorName::Start, AnchorName::Apex, AnchorName::End];
const CURVE: &[AnchorName] = &[AnchorName::Start, AnchorName::End, AnchorName::Control];
const EXTENSION: &[AnchorName] = &[AnchorName::Start, AnchorName::End, AnchorName::Projection];
const POSITION: &[AnchorName] = &[AnchorName::Start, AnchorName::End, AnchorName::Entry];
const FOUR_WAVE: &[AnchorName] = &[AnchorName::P0, AnchorName::P1, AnchorName::P2, AnchorName::P3];
const FIVE_WAVE: &[AnchorName] = &[AnchorName::P0, AnchorName::P1, AnchorName::P2, AnchorName::P3, AnchorName::P4];
const SIX_WAVE: &[AnchorName] =
    &[AnchorName::P0, AnchorName::P1, AnchorName::P2, AnchorName::P3, AnchorName::P4, AnchorName::P5];

const fn clicked(anchors: &'static [AnchorName]) -> KindSpec {
    KindSpec { anchors, clicks: anchors.len(), width_adjust: false, param: None }
}

impl MarkKind {
    /// Every kind, in toolbar order.
    pub const ALL: [MarkKind; 49] = [
        Self::LineSegment,
        Self::ArrowLine,
        Self::ThickArrowLine,
        Self::Ray,
        Self::ExtendedLine,
        Self::HorizontalLine,
        Self::VerticalLine,
        Self::ParallelChannel,
        Self::EquidistantChannel,
        Self::DisjointChannel,
        Self::LinearRegressionChannel,
        Self::AndrewPitchfork,
        Self::EnhancedAndrewPitchfork,
        Self::SchiffPitchfork,
        Self::Rectangle,
        Self::Circle,
        Self::Ellipse,
        Self::Triangle,
        Self::Sector,
        Self::Curve,
        Self::DoubleCurve,
        Self::GannFan,
        Self::GannBox,
        Self::GannRectangle,
        Self::FibonacciRetracement,
        Self::FibonacciExtension,
        Self::FibonacciExtensionBaseTime,
        Self::FibonacciTimeZone,
        Self::FibonacciFan,
        Self::FibonacciArc,
        Self::FibonacciCircle,
        Self::FibonacciSpiral,
        Self::FibonacciWedge,
        Self::FibonacciChannel,
        Self::PriceRange,
        Self::TimeRange,
        Self::TimePriceRange,
        Self::LongPosition,
        Self::ShortPosition,
        Self::Abcd,
        Self::TriangleAbcd,
        Self::Xabcd,
        Self::ElliottImpulse,
        Self::ElliottCorrection,
        Self::ElliottTriangle,
        Self::ElliottDoubleCombination,
        Self::ElliottTripleCombination,
        Self::Text,
        Self::Emoji,
    ];

    /// The kind's descriptor.
    #[must_use]
    pub fn spec(self) -> KindSpec {
        match self {
            Self::LineSegment
            | Self::ArrowLine
            | Self::ThickArrowLine
            | Self::Ray
            | Self::ExtendedLine
            | Self::Rectangle
            | Self::DoubleCurve
            | Self::GannFan
            | Self::GannBox
            | Self::GannRectangle
            | Self::FibonacciRetracement
            | Self::FibonacciTimeZone
            | Self::FibonacciFan
            | Self::FibonacciArc
            | Self::FibonacciCircle
            | Self::FibonacciSpiral
            | Self::PriceRange
            | Self::TimeRange
            | Self::TimePriceRange => clicked(TWO_POINT),
            Self::HorizontalLine | Self::VerticalLine | Self::Text | Self::Emoji => clicked(ONE_POINT),
            Self::ParallelChannel | Self::EquidistantChannel | Self::DisjointChannel | Self::FibonacciChannel => KindSpec {
                anchors: TWO_POINT,
                clicks: 2,
                width_adjust: true,
                param: Some(ParamKind::ChannelHeight),
            },
            Self::LinearRegressionChannel => KindSpec {
                anchors: TWO_POINT,
                clicks: 2,
                width_adjust: false,
                param: Some(ParamKind::Deviation),
            },
            Self::AndrewPitchfork | Self::EnhancedAndrewPitchfork | Self::SchiffPitchfork => clicked(FORK),
            Self::Circle | Self::Ellipse => clicked(RADIAL),
            Self::Triangle => clicked(TRIANGLE),
            Self::Sector | Self::FibonacciWedge => clicked(SECTOR),
            Self::Curve => KindSpec { anchors: CURVE, clicks: 2, width_adjust: false, param: None },
            Self::LongPosition | Self::ShortPosition => {
                KindSpec { anchors: POSITION, clicks: 2, width_adjust: false, param: None }
            }
            Self::FibonacciExtension | Self::FibonacciExtensionBaseTime => clicked(EXTENSION),
            Self::Abcd | Self::TriangleAbcd | Self::ElliottCorrection | Self::ElliottDoubleCombination => {
                clicked(FOUR_WAVE)
            }
            Self::Xabcd => clicked(FIVE_WAVE),
            Self::ElliottImpulse | Self::ElliottTriangle | Self::ElliottTripleCombination => clicked(SIX_WAVE),
        }
    }

    /// Total pointer-down events needed to place one mark.
    #[must_use]
    pub fn placement_clicks(self) -> usize {
        let spec = self.spec();
        spec.clicks + usize::from(spec.width_adjust)
    }

    /// Whether `name` is one of this kind's anchors.
    #[must_use]
    pub fn has_anchor(self, name: AnchorName) -> bool {
        self.spec().anchors.contains(&name)
    }

    /// Whether marks of this kind draw a translucent area fill.
    #[must_use]
    pub fn is_filled(self) -> bool {
        matches!(
            self,
            Self::Rectangle
                | Self::Circle
                | Self::Ellipse
                | Self::Triangle
                | Self::Sector
                | Self::FibonacciWedge
                | Self::PriceRange
                | Self::TimeRange
                | Self::TimePriceRange
                | Self::LongPosition
                | Self::ShortPosition
                | Self::TriangleAbcd
        )
    }

    /// Stable kebab-case name used by toolbars and snapshots.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LineSegment => "line-segment",
            Self::ArrowLine => "arrow-line",
            Self::ThickArrowLine => "thick-arrow-line",
            Self::Ray => "ray",
            Self::ExtendedLine => "extended-line",
            Self::HorizontalLine => "horizontal-line",
            Self::VerticalLine => "vertical-line",
            Self::ParallelChannel => "parallel-channel",
            Self::EquidistantChannel => "equidistant-channel",
            Self::DisjointChannel => "disjoint-channel",
            Self::LinearRegressionChannel => "linear-regression-channel",
            Self::AndrewPitchfork => "andrew-pitchfork",
            Self::EnhancedAndrewPitchfork => "enhanced-andrew-pitchfork",
            Self::SchiffPitchfork => "schiff-pitchfork",
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Ellipse => "ellipse",
            Self::Triangle => "triangle",
            Self::Sector => "sector",
            Self::Curve => "curve",
            Self::DoubleCurve => "double-curve",
            Self::GannFan => "gann-fan",
            Self::GannBox => "gann-box",
            Self::GannRectangle => "gann-rectangle",
            Self::FibonacciRetracement => "fibonacci-retracement",
            Self::FibonacciExtension => "fibonacci-extension",
            Self::FibonacciExtensionBaseTime => "fibonacci-extension-base-time",
            Self::FibonacciTimeZone => "fibonacci-time-zone",
            Self::FibonacciFan => "fibonacci-fan",
            Self::FibonacciArc => "fibonacci-arc",
            Self::FibonacciCircle => "fibonacci-circle",
            Self::FibonacciSpiral => "fibonacci-spiral",
            Self::FibonacciWedge => "fibonacci-wedge",
            Self::FibonacciChannel => "fibonacci-channel",
            Self::PriceRange => "price-range",
            Self::TimeRange => "time-range",
            Self::TimePriceRange => "time-price-range",
            Self::LongPosition => "long-position",
            Self::ShortPosition => "short-position",
            Self::Abcd => "abcd",
            Self::TriangleAbcd => "triangle-abcd",
            Self::Xabcd => "xabcd",
            Self::ElliottImpulse => "elliott-impulse",
            Self::ElliottCorrection => "elliott-correction",
            Self::ElliottTriangle => "elliott-triangle",
            Self::ElliottDoubleCombination => "elliott-double-combination",
            Self::ElliottTripleCombination => "elliott-triple-combination",
            Self::Text => "text",
            Self::Emoji => "emoji",
        }
    }
}

impl FromStr for MarkKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| ParseKindError(s.to_string()))
    }
}

impl std::fmt::Display for MarkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
