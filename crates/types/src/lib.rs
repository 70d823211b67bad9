pub mod color;
pub mod field;
pub mod font;
pub mod geometry;

pub use color::Color;
pub use field::{FieldKind, FieldPosition, UnknownFieldKind};
pub use font::{EmbeddedFont, FontStyle, FormFontInfo, SharedFontData, REGULAR_WEIGHT};
pub use geometry::Rect;
