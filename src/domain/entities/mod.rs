//! Domain entity definitions.

mod catalog;
mod image_kind;
mod selection;
mod title;

pub use catalog::TitleCatalog;
pub use image_kind::{ComicImage, ImageKind, ImageSource};
pub use selection::{Selection, Ticket};
pub use title::{Gap, Title, TitleId};
